//! Repository operations for catalogue entities

use super::{Category, CatalogDb, NavigationHeading, Product, ProductDetail, Review};
use crate::error::Result;
use chrono::{DateTime, Utc};

impl CatalogDb {
    // ===== Navigation Operations =====

    pub async fn get_navigation(&self, id: &str) -> Result<Option<NavigationHeading>> {
        let nav = sqlx::query_as::<_, NavigationHeading>(
            "SELECT * FROM navigation_headings WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(nav)
    }

    pub async fn get_navigation_by_slug(&self, slug: &str) -> Result<Option<NavigationHeading>> {
        let nav = sqlx::query_as::<_, NavigationHeading>(
            "SELECT * FROM navigation_headings WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(nav)
    }

    pub async fn insert_navigation(&self, nav: &NavigationHeading) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO navigation_headings (id, title, slug, url, "order", last_scraped_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&nav.id)
        .bind(&nav.title)
        .bind(&nav.slug)
        .bind(&nav.url)
        .bind(nav.order)
        .bind(nav.last_scraped_at)
        .bind(nav.created_at)
        .bind(nav.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Write every mutable column of an existing heading
    pub async fn save_navigation(&self, nav: &NavigationHeading) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE navigation_headings SET
                title = ?, slug = ?, url = ?, "order" = ?, last_scraped_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&nav.title)
        .bind(&nav.slug)
        .bind(&nav.url)
        .bind(nav.order)
        .bind(nav.last_scraped_at)
        .bind(nav.updated_at)
        .bind(&nav.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_navigations(&self) -> Result<Vec<NavigationHeading>> {
        let navs = sqlx::query_as::<_, NavigationHeading>(
            r#"SELECT * FROM navigation_headings ORDER BY "order", title"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(navs)
    }

    // ===== Category Operations =====

    pub async fn get_category(&self, id: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    pub async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    pub async fn insert_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (
                id, title, slug, url, image_url, product_count, "order",
                parent_id, navigation_id, last_scraped_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&category.id)
        .bind(&category.title)
        .bind(&category.slug)
        .bind(&category.url)
        .bind(&category.image_url)
        .bind(category.product_count)
        .bind(category.order)
        .bind(&category.parent_id)
        .bind(&category.navigation_id)
        .bind(category.last_scraped_at)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn save_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE categories SET
                title = ?, slug = ?, url = ?, image_url = ?, product_count = ?, "order" = ?,
                parent_id = ?, navigation_id = ?, last_scraped_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&category.title)
        .bind(&category.slug)
        .bind(&category.url)
        .bind(&category.image_url)
        .bind(category.product_count)
        .bind(category.order)
        .bind(&category.parent_id)
        .bind(&category.navigation_id)
        .bind(category.last_scraped_at)
        .bind(category.updated_at)
        .bind(&category.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>(r#"SELECT * FROM categories ORDER BY "order", title"#)
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    /// Categories without a parent
    pub async fn list_root_categories(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"SELECT * FROM categories WHERE parent_id IS NULL ORDER BY "order", title"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// Direct children of a category
    pub async fn list_child_categories(&self, parent_id: &str) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"SELECT * FROM categories WHERE parent_id = ? ORDER BY "order", title"#,
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn list_navigation_categories(&self, navigation_id: &str) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"SELECT * FROM categories WHERE navigation_id = ? ORDER BY "order", title"#,
        )
        .bind(navigation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    // ===== Product Operations =====

    pub async fn get_product(&self, id: &str) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn get_product_by_source_id(&self, source_id: &str) -> Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE source_id = ?")
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, source_id, source_url, title, author, price, original_price, currency,
                image_url, condition, format, in_stock, category_id, last_scraped_at,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.source_id)
        .bind(&product.source_url)
        .bind(&product.title)
        .bind(&product.author)
        .bind(product.price)
        .bind(product.original_price)
        .bind(&product.currency)
        .bind(&product.image_url)
        .bind(&product.condition)
        .bind(&product.format)
        .bind(product.in_stock)
        .bind(&product.category_id)
        .bind(product.last_scraped_at)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn save_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE products SET
                source_id = ?, source_url = ?, title = ?, author = ?, price = ?,
                original_price = ?, currency = ?, image_url = ?, condition = ?, format = ?,
                in_stock = ?, category_id = ?, last_scraped_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.source_id)
        .bind(&product.source_url)
        .bind(&product.title)
        .bind(&product.author)
        .bind(product.price)
        .bind(product.original_price)
        .bind(&product.currency)
        .bind(&product.image_url)
        .bind(&product.condition)
        .bind(&product.format)
        .bind(product.in_stock)
        .bind(&product.category_id)
        .bind(product.last_scraped_at)
        .bind(product.updated_at)
        .bind(&product.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Stamp `last_scraped_at` without touching any other field
    pub async fn touch_product(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE products SET last_scraped_at = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn list_category_products(&self, category_id: &str) -> Result<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE category_id = ? ORDER BY title",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    // ===== Detail Operations =====

    pub async fn get_product_detail(&self, product_id: &str) -> Result<Option<ProductDetail>> {
        let detail = sqlx::query_as::<_, ProductDetail>(
            "SELECT * FROM product_details WHERE product_id = ?",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(detail)
    }

    pub async fn insert_product_detail(&self, detail: &ProductDetail) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product_details (
                id, product_id, description, publisher, publication_date, isbn, isbn13, pages,
                language, dimensions, weight, specs, ratings_avg, reviews_count,
                related_products, recommended_products, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&detail.id)
        .bind(&detail.product_id)
        .bind(&detail.description)
        .bind(&detail.publisher)
        .bind(detail.publication_date)
        .bind(&detail.isbn)
        .bind(&detail.isbn13)
        .bind(detail.pages)
        .bind(&detail.language)
        .bind(&detail.dimensions)
        .bind(&detail.weight)
        .bind(&detail.specs)
        .bind(detail.ratings_avg)
        .bind(detail.reviews_count)
        .bind(&detail.related_products)
        .bind(&detail.recommended_products)
        .bind(detail.created_at)
        .bind(detail.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn save_product_detail(&self, detail: &ProductDetail) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE product_details SET
                description = ?, publisher = ?, publication_date = ?, isbn = ?, isbn13 = ?,
                pages = ?, language = ?, dimensions = ?, weight = ?, specs = ?,
                ratings_avg = ?, reviews_count = ?, related_products = ?,
                recommended_products = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&detail.description)
        .bind(&detail.publisher)
        .bind(detail.publication_date)
        .bind(&detail.isbn)
        .bind(&detail.isbn13)
        .bind(detail.pages)
        .bind(&detail.language)
        .bind(&detail.dimensions)
        .bind(&detail.weight)
        .bind(&detail.specs)
        .bind(detail.ratings_avg)
        .bind(detail.reviews_count)
        .bind(&detail.related_products)
        .bind(&detail.recommended_products)
        .bind(detail.updated_at)
        .bind(&detail.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ===== Review Operations =====

    pub async fn insert_review(&self, review: &Review) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, product_id, author, rating, title, text, review_date, verified, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&review.id)
        .bind(&review.product_id)
        .bind(&review.author)
        .bind(review.rating)
        .bind(&review.title)
        .bind(&review.text)
        .bind(review.review_date)
        .bind(review.verified)
        .bind(review.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete all reviews of a product, returning how many were removed
    pub async fn delete_reviews_by_product(&self, product_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM reviews WHERE product_id = ?")
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn list_reviews(&self, product_id: &str) -> Result<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE product_id = ? ORDER BY created_at, rowid",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use crate::meta::{test_db, Category, NavigationHeading, Product, ProductDetail, Review};
    use crate::extract::ProductRef;
    use chrono::{NaiveDate, Utc};
    use sqlx::types::Json;

    #[tokio::test]
    async fn test_category_tree_queries() {
        let (db, _tmp) = test_db().await;
        let now = Utc::now();

        let nav = NavigationHeading::new("Books".into(), "books".into(), "https://x.test/books".into(), now);
        db.insert_navigation(&nav).await.unwrap();

        let mut fiction = Category::new("Fiction".into(), "fiction".into(), "https://x.test/c/fiction".into(), now);
        fiction.navigation_id = Some(nav.id.clone());
        db.insert_category(&fiction).await.unwrap();

        let mut crime = Category::new("Crime".into(), "crime".into(), "https://x.test/c/crime".into(), now);
        crime.parent_id = Some(fiction.id.clone());
        db.insert_category(&crime).await.unwrap();

        let roots = db.list_root_categories().await.unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].slug, "fiction");

        let children = db.list_child_categories(&fiction.id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, crime.id);
        assert!(db.list_child_categories(&crime.id).await.unwrap().is_empty());

        let under_nav = db.list_navigation_categories(&nav.id).await.unwrap();
        assert_eq!(under_nav.len(), 1);
        assert_eq!(db.list_categories().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_product_save_and_touch() {
        let (db, _tmp) = test_db().await;
        let now = Utc::now();

        let mut product = Product::new(
            "dune".into(),
            "https://x.test/products/dune".into(),
            "Dune".into(),
            now,
        );
        product.price = Some(4.99);
        db.insert_product(&product).await.unwrap();

        product.title = "Dune (Deluxe)".into();
        db.save_product(&product).await.unwrap();

        let loaded = db.get_product_by_source_id("dune").await.unwrap().unwrap();
        assert_eq!(loaded.title, "Dune (Deluxe)");
        assert_eq!(loaded.price, Some(4.99));
        assert!(loaded.in_stock);
        assert!(loaded.last_scraped_at.is_none());

        db.touch_product(&product.id, now).await.unwrap();
        let touched = db.get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(touched.last_scraped_at, Some(now));
        assert_eq!(touched.title, "Dune (Deluxe)");
    }

    #[tokio::test]
    async fn test_detail_json_columns() {
        let (db, _tmp) = test_db().await;
        let now = Utc::now();
        let product = Product::new("p1".into(), "https://x.test/products/p1".into(), "P1".into(), now);
        db.insert_product(&product).await.unwrap();

        let mut detail = ProductDetail::new(product.id.clone(), now);
        detail.specs.0.insert("Format".into(), "Paperback".into());
        detail.publication_date = NaiveDate::from_ymd_opt(1965, 8, 1);
        detail.related_products = Json(vec![ProductRef {
            source_id: "p2".into(),
            title: "P2".into(),
            url: "https://x.test/products/p2".into(),
        }]);
        db.insert_product_detail(&detail).await.unwrap();

        let loaded = db.get_product_detail(&product.id).await.unwrap().unwrap();
        assert_eq!(loaded.specs.0.get("Format").map(String::as_str), Some("Paperback"));
        assert_eq!(loaded.related_products.0.len(), 1);
        assert!(loaded.recommended_products.0.is_empty());
        assert_eq!(loaded.publication_date, NaiveDate::from_ymd_opt(1965, 8, 1));
    }

    #[tokio::test]
    async fn test_delete_reviews_by_product() {
        let (db, _tmp) = test_db().await;
        let now = Utc::now();
        let product = Product::new("p1".into(), "https://x.test/products/p1".into(), "P1".into(), now);
        db.insert_product(&product).await.unwrap();

        for i in 0..3 {
            let mut review = Review::new(product.id.clone(), now);
            review.rating = Some(i + 1);
            db.insert_review(&review).await.unwrap();
        }
        assert_eq!(db.list_reviews(&product.id).await.unwrap().len(), 3);
        assert_eq!(db.delete_reviews_by_product(&product.id).await.unwrap(), 3);
        assert!(db.list_reviews(&product.id).await.unwrap().is_empty());
    }
}
