// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service categories and the status rollup.

use devarch_core::CategoryId;
use sqlx::FromRow;

use crate::error::{SqlxResultExt, StoreError};
use crate::Store;

#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub color: Option<String>,
    pub startup_order: i32,
}

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub name: String,
    pub display_name: String,
    pub color: Option<String>,
    pub startup_order: i32,
}

/// Per-category service counts for the status endpoint.
#[derive(Debug, Clone, FromRow)]
pub struct CategoryRollup {
    pub name: String,
    pub display_name: String,
    pub startup_order: i32,
    pub services: i64,
    pub enabled_services: i64,
}

impl Store {
    pub async fn upsert_category(&self, new: &NewCategory) -> Result<Category, StoreError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, display_name, color, startup_order)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (name) DO UPDATE SET
                 display_name = EXCLUDED.display_name,
                 color = EXCLUDED.color,
                 startup_order = EXCLUDED.startup_order
             RETURNING *",
        )
        .bind(&new.name)
        .bind(&new.display_name)
        .bind(&new.color)
        .bind(new.startup_order)
        .fetch_one(&self.pool)
        .await
        .map_store(&format!("category {}", new.name))
    }

    /// Categories in bulk-operation startup order.
    pub async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY startup_order, name")
            .fetch_all(&self.pool)
            .await
            .map_store("categories")
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Category, StoreError> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id.as_i64())
            .fetch_one(&self.pool)
            .await
            .map_store(&format!("category {id}"))
    }

    /// Per-category template counts, ordered by startup order.
    pub async fn category_rollup(&self) -> Result<Vec<CategoryRollup>, StoreError> {
        sqlx::query_as::<_, CategoryRollup>(
            "SELECT c.name, c.display_name, c.startup_order,
                    COUNT(s.id) AS services,
                    COUNT(s.id) FILTER (WHERE s.enabled) AS enabled_services
             FROM categories c
             LEFT JOIN services s ON s.category_id = c.id
             GROUP BY c.id
             ORDER BY c.startup_order, c.name",
        )
        .fetch_all(&self.pool)
        .await
        .map_store("category rollup")
    }
}
