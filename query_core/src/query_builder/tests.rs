//! Statement compiler tests

#[cfg(test)]
mod tests {
    use crate::errors::ErrorCategory;
    use crate::query_builder::test_support::{lazy_pool, products};
    use crate::query_builder::{
        GroupParent, OnConflict, Operator, QueryState, SqlGenerator, UpdateSet, WhereClause,
        WhereGroup,
    };
    use crate::traits::{Filterable, Relation};
    use crate::value::{FieldMap, QueryValue};

    fn text(s: &str) -> QueryValue {
        QueryValue::Text(s.to_string())
    }

    // ========================================
    // SELECT
    // ========================================

    #[tokio::test]
    async fn test_basic_select() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .where_eq("category", "books")
            .order_by_desc("price")
            .limit(10)
            .offset(20)
            .to_statement()
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT * FROM products WHERE category = $1 ORDER BY price DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(stmt.args, vec![text("books")]);
    }

    #[test]
    fn test_stable_order_for_windows() {
        let mut state = QueryState::new("products", "id");
        state.ensure_stable_order();
        state.limit = Some(20);
        state.offset = Some(20);
        assert_eq!(
            SqlGenerator::select(&state).unwrap().sql,
            "SELECT * FROM products ORDER BY id ASC LIMIT 20 OFFSET 20"
        );

        let mut grouped = QueryState::new("products", "id");
        grouped.columns = vec!["category".to_string(), "COUNT(*)".to_string()];
        grouped.group_by.fields.push("category".to_string());
        grouped.ensure_stable_order();
        assert_eq!(
            SqlGenerator::select(&grouped).unwrap().sql,
            "SELECT category, COUNT(*) FROM products GROUP BY category ORDER BY category ASC"
        );
    }

    #[tokio::test]
    async fn test_caller_order_is_kept_for_windows() {
        let pool = lazy_pool();
        let builder = products(&pool).order_by_desc("price");
        let mut state = builder.state().clone();
        state.ensure_stable_order();
        assert_eq!(state.order_by, builder.state().order_by);
    }

    #[tokio::test]
    async fn test_compilation_is_deterministic() {
        let pool = lazy_pool();
        let builder = products(&pool)
            .where_in("category", ["books", "games"])
            .or_group()
            .where_op("price", Operator::Lt, 500)
            .where_like("name", "%sale%")
            .end()
            .order_by_asc("name");

        let first = builder.to_statement().unwrap();
        let second = builder.to_statement().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_call_order_does_not_change_statement() {
        let pool = lazy_pool();
        let a = products(&pool)
            .limit(5)
            .order_by_asc("name")
            .where_eq("category", "books")
            .distinct()
            .to_statement()
            .unwrap();
        let b = products(&pool)
            .distinct()
            .where_eq("category", "books")
            .order_by_asc("name")
            .limit(5)
            .to_statement()
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(
            a.sql,
            "SELECT DISTINCT * FROM products WHERE category = $1 ORDER BY name ASC LIMIT 5"
        );
    }

    #[tokio::test]
    async fn test_select_columns() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .select(["id", "name"])
            .to_statement()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT id, name FROM products");
        assert!(stmt.args.is_empty());
    }

    #[tokio::test]
    async fn test_table_override() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .table("archive.products")
            .to_statement()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM archive.products");
    }

    // ========================================
    // IN / NULL handling
    // ========================================

    #[tokio::test]
    async fn test_empty_in_matches_nothing() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .where_in("id", Vec::<i64>::new())
            .to_statement()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM products WHERE 1 = 0");
        assert!(stmt.args.is_empty());
    }

    #[tokio::test]
    async fn test_empty_not_in_matches_everything() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .where_not_in("id", Vec::<i64>::new())
            .where_eq("category", "books")
            .to_statement()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM products WHERE 1 = 1 AND category = $1");
        assert_eq!(stmt.args, vec![text("books")]);
    }

    #[tokio::test]
    async fn test_in_list_placeholders() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .where_in("id", [1i64, 2, 3])
            .where_not_in("category", ["toys"])
            .to_statement()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM products WHERE id IN ($1, $2, $3) AND category NOT IN ($4)"
        );
        assert_eq!(
            stmt.args,
            vec![
                QueryValue::I64(1),
                QueryValue::I64(2),
                QueryValue::I64(3),
                text("toys")
            ]
        );
    }

    #[tokio::test]
    async fn test_null_values_render_is_null() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .where_eq("deleted_at", None::<i64>)
            .where_op("category", Operator::Ne, QueryValue::Null)
            .where_not_null("sku")
            .to_statement()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM products WHERE deleted_at IS NULL AND category IS NOT NULL AND sku IS NOT NULL"
        );
        assert!(stmt.args.is_empty());
    }

    #[tokio::test]
    async fn test_negated_predicate() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .where_not("category", "books")
            .to_statement()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM products WHERE NOT (category = $1)");
    }

    // ========================================
    // Groups
    // ========================================

    #[tokio::test]
    async fn test_nested_groups() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .and_group()
            .where_eq("category", "books")
            .or_group()
            .where_op("price", Operator::Lt, 500)
            .where_op("stock", Operator::Gt, 10)
            .end()
            .end()
            .to_statement()
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT * FROM products WHERE (category = $1 AND (price < $2 OR stock > $3))"
        );
        assert_eq!(
            stmt.args,
            vec![text("books"), QueryValue::I32(500), QueryValue::I32(10)]
        );
    }

    #[tokio::test]
    async fn test_prebuilt_group_matches_fluent_group() {
        let pool = lazy_pool();
        let fluent = products(&pool)
            .or_group()
            .where_eq("category", "books")
            .where_eq("category", "games")
            .end()
            .to_statement()
            .unwrap();
        let prebuilt = products(&pool)
            .where_group(
                WhereGroup::or()
                    .with(WhereClause::eq("category", "books"))
                    .with(WhereClause::eq("category", "games")),
            )
            .to_statement()
            .unwrap();
        assert_eq!(fluent, prebuilt);
    }

    #[tokio::test]
    async fn test_empty_group_adds_nothing() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .where_eq("category", "books")
            .or_group()
            .end()
            .to_statement()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM products WHERE category = $1");
    }

    #[tokio::test]
    async fn test_negated_group() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .or_group()
            .not()
            .where_eq("category", "books")
            .where_null("deleted_at")
            .end()
            .to_statement()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM products WHERE NOT (category = $1 OR deleted_at IS NULL)"
        );
    }

    // ========================================
    // Joins
    // ========================================

    #[tokio::test]
    async fn test_join_arguments_precede_where_arguments() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .where_eq("products.category", "books")
            .join("order_items")
            .alias("oi")
            .on("oi.product_id", Operator::Eq, "products.id")
            .and_value("oi.quantity", Operator::Gt, 2)
            .end()
            .to_statement()
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT products.* FROM products INNER JOIN order_items AS oi \
             ON oi.product_id = products.id AND oi.quantity > $1 \
             WHERE products.category = $2"
        );
        assert_eq!(stmt.args, vec![QueryValue::I32(2), text("books")]);
    }

    #[tokio::test]
    async fn test_join_kinds() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .select(["products.name", "reviews.rating"])
            .left_join("reviews")
            .on("reviews.product_id", Operator::Eq, "products.id")
            .end()
            .full_join("suppliers")
            .on("suppliers.id", Operator::Eq, "products.supplier_id")
            .end()
            .to_statement()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT products.name, reviews.rating FROM products \
             LEFT JOIN reviews ON reviews.product_id = products.id \
             FULL OUTER JOIN suppliers ON suppliers.id = products.supplier_id"
        );
    }

    #[tokio::test]
    async fn test_join_null_value_uses_is_null() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .left_join("reviews")
            .on("reviews.product_id", Operator::Eq, "products.id")
            .and_value("reviews.deleted_at", Operator::Eq, QueryValue::Null)
            .and_value("reviews.body", Operator::Ne, QueryValue::Null)
            .end()
            .where_eq("products.category", "books")
            .to_statement()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT products.* FROM products LEFT JOIN reviews \
             ON reviews.product_id = products.id AND reviews.deleted_at IS NULL \
             AND reviews.body IS NOT NULL WHERE products.category = $1"
        );
        assert_eq!(stmt.args, vec![text("books")]);

        let error = products(&pool)
            .join("reviews")
            .on_value("reviews.rating", Operator::Gt, QueryValue::Null)
            .end()
            .to_statement()
            .unwrap_err();
        assert_eq!(error.category(), ErrorCategory::Validation);
    }

    #[tokio::test]
    async fn test_join_without_condition_is_rejected() {
        let pool = lazy_pool();
        let error = products(&pool)
            .join("reviews")
            .end()
            .to_statement()
            .unwrap_err();
        assert_eq!(error.category(), ErrorCategory::Validation);
    }

    // ========================================
    // GROUP BY / HAVING / raw fragments / locking
    // ========================================

    #[tokio::test]
    async fn test_having_continues_placeholder_numbering() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .select(["category", "SUM(stock) AS total_stock"])
            .where_null("deleted_at")
            .where_eq("price", 100)
            .group_by(["category"])
            .having_raw("SUM(stock) > ?", vec![10.into()])
            .having("COUNT(*)", Operator::Gte, 2)
            .to_statement()
            .unwrap();

        assert_eq!(
            stmt.sql,
            "SELECT category, SUM(stock) AS total_stock FROM products \
             WHERE deleted_at IS NULL AND price = $1 GROUP BY category \
             HAVING (SUM(stock) > $2) AND COUNT(*) >= $3"
        );
        assert_eq!(
            stmt.args,
            vec![QueryValue::I32(100), QueryValue::I32(10), QueryValue::I32(2)]
        );
    }

    #[tokio::test]
    async fn test_raw_fragment_is_renumbered() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .where_eq("category", "books")
            .where_raw("price BETWEEN ? AND ?", vec![100.into(), 900.into()])
            .where_raw("metadata ?? ?", vec!["featured".into()])
            .to_statement()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM products WHERE category = $1 AND (price BETWEEN $2 AND $3) AND (metadata ? $4)"
        );
        assert_eq!(stmt.args.len(), 4);
    }

    #[tokio::test]
    async fn test_raw_placeholder_mismatch() {
        let pool = lazy_pool();
        let too_few = products(&pool)
            .where_raw("price > ? AND price < ?", vec![1.into()])
            .to_statement();
        assert!(matches!(too_few, Err(crate::errors::QueryError::Validation(_))));

        let too_many = products(&pool)
            .where_raw("price > ?", vec![1.into(), 2.into()])
            .to_statement();
        assert!(matches!(too_many, Err(crate::errors::QueryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_lock_hint_comes_last() {
        let pool = lazy_pool();
        let stmt = products(&pool)
            .where_id(7i64)
            .order_by_asc("id")
            .limit(1)
            .for_update()
            .to_statement()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM products WHERE id = $1 ORDER BY id ASC LIMIT 1 FOR UPDATE"
        );
    }

    #[tokio::test]
    async fn test_identifiers_are_validated() {
        let pool = lazy_pool();
        assert!(products(&pool)
            .where_eq("name; DROP TABLE products", 1)
            .to_statement()
            .is_err());
        assert!(products(&pool).order_by_asc("select").to_statement().is_err());
        assert!(products(&pool).table("bad table").to_statement().is_err());
        assert!(products(&pool).group_by(["1=1"]).to_statement().is_err());
    }

    // ========================================
    // COUNT / EXISTS
    // ========================================

    #[tokio::test]
    async fn test_count_ignores_projection_and_window() {
        let pool = lazy_pool();
        let builder = products(&pool)
            .select(["name"])
            .distinct()
            .where_eq("category", "books")
            .order_by_asc("name")
            .limit(5)
            .offset(10)
            .with_relation("reviews");

        let stmt = SqlGenerator::count(builder.state()).unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM products WHERE category = $1");
        assert_eq!(stmt.args, vec![text("books")]);
    }

    #[tokio::test]
    async fn test_count_with_group_by_counts_groups() {
        let pool = lazy_pool();
        let builder = products(&pool)
            .group_by(["category"])
            .having("COUNT(*)", Operator::Gt, 2);
        let stmt = SqlGenerator::count(builder.state()).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) FROM (SELECT 1 FROM products GROUP BY category HAVING COUNT(*) > $1) AS grouped"
        );
    }

    #[tokio::test]
    async fn test_exists() {
        let pool = lazy_pool();
        let builder = products(&pool).where_eq("sku", "A-1").limit(3);
        let stmt = SqlGenerator::exists(builder.state()).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT EXISTS(SELECT 1 FROM products WHERE sku = $1)"
        );
    }

    // ========================================
    // INSERT
    // ========================================

    #[test]
    fn test_insert_many_rows() {
        let rows = vec![
            FieldMap::new().set("price", 10).set("name", "A"),
            FieldMap::new().set("name", "B").set("price", QueryValue::Null),
        ];
        let stmt = SqlGenerator::insert("products", &rows, None, false).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO products (name, price) VALUES ($1, $2), ($3, NULL)"
        );
        assert_eq!(stmt.args, vec![text("A"), QueryValue::I32(10), text("B")]);
    }

    #[test]
    fn test_insert_rejects_mismatched_rows() {
        let rows = vec![
            FieldMap::new().set("name", "A"),
            FieldMap::new().set("name", "B").set("price", 1),
        ];
        assert!(SqlGenerator::insert("products", &rows, None, false).is_err());
        assert!(SqlGenerator::insert("products", &[], None, false).is_err());
        assert!(SqlGenerator::insert("products", &[FieldMap::new()], None, false).is_err());
    }

    #[test]
    fn test_upsert_clauses() {
        let row = [FieldMap::new().set("sku", "A-1").set("price", 10)];

        let update = OnConflict::columns(["sku"]).do_update(["price"]);
        let stmt = SqlGenerator::insert("products", &row, Some(&update), true).unwrap();
        assert_eq!(
            stmt.sql,
            "INSERT INTO products (price, sku) VALUES ($1, $2) \
             ON CONFLICT (sku) DO UPDATE SET price = EXCLUDED.price RETURNING *"
        );

        let nothing = OnConflict::columns(["sku"]).do_nothing();
        let stmt = SqlGenerator::insert("products", &row, Some(&nothing), false).unwrap();
        assert!(stmt.sql.ends_with("ON CONFLICT (sku) DO NOTHING"));

        let untargeted = OnConflict::columns(Vec::<String>::new()).do_nothing();
        assert!(SqlGenerator::insert("products", &row, Some(&untargeted), false).is_err());
    }

    // ========================================
    // UPDATE / DELETE
    // ========================================

    #[tokio::test]
    async fn test_update_numbers_set_before_where() {
        let pool = lazy_pool();
        let builder = products(&pool).where_id(7i64);
        let set = UpdateSet::new().set("name", "X").decrement("stock", 2);
        let stmt = SqlGenerator::update(builder.state(), &set, false).unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE products SET name = $1, stock = stock - $2 WHERE id = $3"
        );
        assert_eq!(
            stmt.args,
            vec![text("X"), QueryValue::I32(2), QueryValue::I64(7)]
        );
    }

    #[tokio::test]
    async fn test_update_returning_and_null_assignment() {
        let pool = lazy_pool();
        let builder = products(&pool).where_id(7i64);
        let set = UpdateSet::new().set("deleted_at", QueryValue::Null);
        let stmt = SqlGenerator::update(builder.state(), &set, true).unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE products SET deleted_at = NULL WHERE id = $1 RETURNING *"
        );
        assert_eq!(stmt.args, vec![QueryValue::I64(7)]);
    }

    #[test]
    fn test_unconditional_mutation_needs_confirmation() {
        let mut state = QueryState::new("products", "id");
        let set = UpdateSet::new().set("stock", 0);

        let error = SqlGenerator::update(&state, &set, false).unwrap_err();
        assert_eq!(error.category(), ErrorCategory::Validation);
        assert!(SqlGenerator::delete(&state, false).is_err());

        // a group with no predicates is still no condition
        state.where_groups.push(WhereGroup::or());
        assert!(SqlGenerator::delete(&state, false).is_err());

        state.unconditional = true;
        assert_eq!(
            SqlGenerator::update(&state, &set, false).unwrap().sql,
            "UPDATE products SET stock = $1"
        );
        assert_eq!(
            SqlGenerator::delete(&state, true).unwrap().sql,
            "DELETE FROM products RETURNING *"
        );
    }

    #[tokio::test]
    async fn test_always_true_filter_is_no_condition() {
        let pool = lazy_pool();
        let set = UpdateSet::new().set("stock", 0);
        let keep: Vec<i64> = Vec::new();

        let everything = products(&pool).where_not_in("id", keep.clone());
        let error = SqlGenerator::update(everything.state(), &set, false).unwrap_err();
        assert_eq!(error.category(), ErrorCategory::Validation);
        assert!(SqlGenerator::delete(everything.state(), false).is_err());

        let either = products(&pool)
            .or_group()
            .where_eq("category", "books")
            .where_not_in("id", keep.clone())
            .end();
        assert!(SqlGenerator::delete(either.state(), false).is_err());

        // an always-false filter still restricts: it matches nothing
        let nothing = products(&pool).where_in("id", keep.clone());
        assert_eq!(
            SqlGenerator::delete(nothing.state(), false).unwrap().sql,
            "DELETE FROM products WHERE 1 = 0"
        );

        let scoped = products(&pool)
            .where_eq("category", "books")
            .where_not_in("id", keep.clone());
        assert_eq!(
            SqlGenerator::delete(scoped.state(), false).unwrap().sql,
            "DELETE FROM products WHERE category = $1 AND 1 = 1"
        );

        let confirmed = products(&pool)
            .where_not_in("id", keep)
            .confirm_unconditional();
        assert_eq!(
            SqlGenerator::delete(confirmed.state(), false).unwrap().sql,
            "DELETE FROM products WHERE 1 = 1"
        );
    }

    #[tokio::test]
    async fn test_mutation_rejects_select_only_clauses() {
        let pool = lazy_pool();
        let limited = products(&pool).where_eq("category", "books").limit(10);
        assert!(SqlGenerator::delete(limited.state(), false).is_err());

        let joined = products(&pool)
            .where_eq("category", "books")
            .join("reviews")
            .on("reviews.product_id", Operator::Eq, "products.id")
            .end();
        let set = UpdateSet::new().set("stock", 0);
        assert!(SqlGenerator::update(joined.state(), &set, false).is_err());

        let empty_set = products(&pool).where_id(1i64);
        assert!(SqlGenerator::update(empty_set.state(), &UpdateSet::new(), false).is_err());
    }

    #[test]
    fn test_delete_with_groups() {
        let mut state = QueryState::new("products", "id");
        state
            .where_groups
            .push(WhereGroup::or().with(WhereClause::eq("stock", 0)).with(WhereClause::is_not_null("deleted_at")));
        let stmt = SqlGenerator::delete(&state, false).unwrap();
        assert_eq!(
            stmt.sql,
            "DELETE FROM products WHERE (stock = $1 OR deleted_at IS NOT NULL)"
        );
    }

    // ========================================
    // Relation loading
    // ========================================

    #[test]
    fn test_relation_load_statement() {
        let relation = Relation::has_many("reviews", "reviews", "product_id");
        let keys = vec![QueryValue::I64(1), QueryValue::I64(2)];
        let stmt = SqlGenerator::relation_load(&relation, &keys).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT row_to_json(r) FROM reviews r WHERE r.product_id IN ($1, $2)"
        );
        assert_eq!(stmt.args, keys);
    }
}
