//! Categories repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Category, CreateCategory},
};

#[derive(Clone)]
pub struct CategoriesRepository {
    pool: Pool<Postgres>,
}

impl CategoriesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get category by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    /// List all categories
    pub async fn list_all(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    /// Create a new category
    pub async fn create(&self, category: &CreateCategory) -> AppResult<Category> {
        let created = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, borrow_limit, rent_price, overdue_penalty)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&category.name)
        .bind(category.limit)
        .bind(category.rent_price)
        .bind(category.overdue_penalty)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Overwrite every column of a category
    pub async fn update(&self, category: &Category) -> AppResult<()> {
        let rows = sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, borrow_limit = $3, rent_price = $4, overdue_penalty = $5
            WHERE id = $1
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(category.limit)
        .bind(category.rent_price)
        .bind(category.overdue_penalty)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(format!("Category with id {} not found", category.id)));
        }
        Ok(())
    }
}
