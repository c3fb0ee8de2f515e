//! Wire types for the RedSeam REST API.
//!
//! These mirror the JSON the server speaks. Conversions into the domain
//! types of `redseam-core` live next to the types they convert.

use redseam_core::{LineItem, Price, ProductId, Quantity, UserId};
use serde::{Deserialize, Serialize};

// =============================================================================
// Cart Types
// =============================================================================

/// Body of `POST /cart/products/{id}` and `PATCH /cart/products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineRequest {
    pub quantity: u32,
    pub color: String,
    pub size: String,
}

/// Body of `DELETE /cart/products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineSelector {
    pub color: String,
    pub size: String,
}

/// A line item as returned by the cart endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product ID (the server reuses the product's ID for the line).
    pub id: ProductId,
    pub name: String,
    /// Unit price.
    pub price: Price,
    pub quantity: u32,
    pub color: String,
    pub size: String,
    /// Color-specific display image, when the server echoes one.
    #[serde(default)]
    pub image: Option<String>,
    /// Product cover image, unrelated to the selected color.
    #[serde(default)]
    pub cover_image: Option<String>,
    /// `price × quantity` as computed by the server.
    #[serde(default)]
    pub total_price: Option<Price>,
}

impl CartLine {
    /// Display image the server returned, ignoring empty strings.
    #[must_use]
    pub fn display_image(&self) -> Option<&str> {
        self.image.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Convert into a domain line item, keeping the server's image if any.
    #[must_use]
    pub fn into_line_item(self) -> LineItem {
        let image = self.display_image().map(ToOwned::to_owned);
        LineItem {
            product_id: self.id,
            name: self.name,
            unit_price: self.price,
            color: self.color,
            size: self.size,
            quantity: Quantity::from_server(self.quantity),
            image,
        }
    }
}

// =============================================================================
// Product Types
// =============================================================================

/// Product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    #[serde(default)]
    pub id: Option<i32>,
    pub name: String,
    /// Brand logo URL.
    #[serde(default)]
    pub image: Option<String>,
}

/// Brand as sent by the server: either a full object or just its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BrandInfo {
    Full(Brand),
    Name(String),
}

impl BrandInfo {
    /// Brand display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Full(brand) => &brand.name,
            Self::Name(name) => name,
        }
    }

    /// Brand logo URL, if the server sent one inline.
    #[must_use]
    pub fn logo(&self) -> Option<&str> {
        match self {
            Self::Full(brand) => brand.image.as_deref(),
            Self::Name(_) => None,
        }
    }
}

/// A product as listed by `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub cover_image: Option<String>,
}

/// Full product detail from `GET /products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Image per color, in the same order as `colors`.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, alias = "available_colors")]
    pub colors: Vec<String>,
    #[serde(default, alias = "available_sizes")]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub brand: Option<BrandInfo>,
    #[serde(default)]
    pub brand_logo: Option<String>,
    #[serde(default)]
    pub default_color: Option<String>,
    #[serde(default)]
    pub default_size: Option<String>,
    #[serde(default)]
    pub default_image: Option<String>,
}

impl Product {
    /// Color preselected on the product page.
    #[must_use]
    pub fn preselected_color(&self) -> Option<&str> {
        self.default_color
            .as_deref()
            .or_else(|| self.colors.first().map(String::as_str))
    }

    /// Size preselected on the product page.
    #[must_use]
    pub fn preselected_size(&self) -> Option<&str> {
        self.default_size
            .as_deref()
            .or_else(|| self.sizes.first().map(String::as_str))
    }

    /// Brand logo, whether sent inline with the brand or alongside it.
    #[must_use]
    pub fn brand_logo(&self) -> Option<&str> {
        self.brand
            .as_ref()
            .and_then(BrandInfo::logo)
            .or(self.brand_logo.as_deref())
    }

    /// Image shown for the given color.
    ///
    /// Images are listed in color order; falls back to the default or cover
    /// image when the color has no dedicated image.
    #[must_use]
    pub fn image_for_color(&self, color: &str) -> Option<&str> {
        self.colors
            .iter()
            .position(|c| c.eq_ignore_ascii_case(color))
            .and_then(|i| self.images.get(i))
            .or(self.default_image.as_ref())
            .or(self.cover_image.as_ref())
            .map(String::as_str)
    }
}

/// Pagination metadata of a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    #[serde(default)]
    pub total: u32,
}

/// One page of `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub data: Vec<ProductSummary>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

/// Sort order of a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductSort {
    PriceAscending,
    PriceDescending,
    Newest,
}

impl ProductSort {
    /// Value of the `sort` query parameter.
    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::PriceAscending => "price",
            Self::PriceDescending => "-price",
            Self::Newest => "-created_at",
        }
    }
}

/// Filters and paging for `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub price_from: Option<u32>,
    pub price_to: Option<u32>,
    pub sort: Option<ProductSort>,
}

impl ProductQuery {
    /// Query parameters in the server's `filter[...]` notation.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(from) = self.price_from {
            params.push(("filter[price_from]", from.to_string()));
        }
        if let Some(to) = self.price_to {
            params.push(("filter[price_to]", to.to_string()));
        }
        if let Some(sort) = self.sort {
            params.push(("sort", sort.as_param().to_string()));
        }
        params
    }

    /// Stable cache key for this query.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let params = self
            .params()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("products:{params}")
    }
}

// =============================================================================
// Account Types
// =============================================================================

/// Body of `POST /login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// An avatar image attached to a registration.
#[derive(Clone, PartialEq, Eq)]
pub struct AvatarFile {
    pub file_name: String,
    /// MIME type, e.g. `image/png`.
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for AvatarFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarFile")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Fields of the `POST /register` multipart form.
#[derive(Clone)]
pub struct RegisterRequest<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub password_confirmation: &'a str,
    pub avatar: Option<&'a AvatarFile>,
}

/// Authenticated user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    pub email: String,
    #[serde(default, alias = "avatar")]
    pub profile_photo: Option<String>,
}

/// Response of `POST /login` and `POST /register`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}
