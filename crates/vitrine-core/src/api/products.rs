//! Product catalog endpoints.

use serde::{Deserialize, Serialize};

use super::error::ApiResult;
use super::pipeline::ApiClient;
use super::request::{ApiRequest, resource_path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sku: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_featured: bool,
}

fn default_true() -> bool {
    true
}

/// Fields for create and partial update. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_new: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ProductQuery {
    fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .query_opt("category", self.category.as_deref())
            .query_opt("search", self.search.as_deref())
            .query_opt("limit", self.limit)
            .query_opt("offset", self.offset)
    }
}

impl ApiClient {
    /// # Errors
    /// Any pipeline error.
    pub async fn list_products(&self, query: &ProductQuery) -> ApiResult<Vec<Product>> {
        self.execute(query.apply(ApiRequest::get("/products"))).await
    }

    /// # Errors
    /// Any pipeline error.
    pub async fn get_product(&self, id: &str) -> ApiResult<Product> {
        self.execute(ApiRequest::get(resource_path("/products", id)?))
            .await
    }

    /// # Errors
    /// Any pipeline error.
    pub async fn create_product(&self, product: &ProductInput) -> ApiResult<Product> {
        self.execute(ApiRequest::post("/products").json(product)?)
            .await
    }

    /// Applies a partial update; only fields set in `changes` are sent.
    ///
    /// # Errors
    /// Any pipeline error.
    pub async fn update_product(&self, id: &str, changes: &ProductInput) -> ApiResult<Product> {
        self.execute(ApiRequest::patch(resource_path("/products", id)?).json(changes)?)
            .await
    }

    /// # Errors
    /// Any pipeline error.
    pub async fn delete_product(&self, id: &str) -> ApiResult<()> {
        self.execute_unit(ApiRequest::delete(resource_path("/products", id)?))
            .await
    }

    /// # Errors
    /// Any pipeline error.
    pub async fn list_categories(&self) -> ApiResult<Vec<Category>> {
        self.execute(ApiRequest::get("/categories")).await
    }
}
