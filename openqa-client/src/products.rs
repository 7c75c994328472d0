//! Product (medium) operations.

use crate::client::Instance;
use crate::envelope;
use crate::error::Result;
use crate::settings::FormBody;
use crate::types::{Product, WireProduct};

impl Instance {
    /// List all products.
    pub async fn get_products(&self) -> Result<Vec<Product>> {
        self.fetch_products(&self.url("products")).await
    }

    /// Get one product.
    pub async fn get_product(&self, id: i64) -> Result<Product> {
        let products = self
            .fetch_products(&self.url(&format!("products/{}", id)))
            .await?;
        envelope::first(products, format_args!("product {}", id))
    }

    /// Create a product, or update it if `product.id` is set.
    pub async fn post_product(&self, product: &Product) -> Result<Product> {
        let url = if product.id == 0 {
            self.url("products")
        } else {
            self.url(&format!("products/{}", product.id))
        };
        let form = product_form(product).encode();
        if self.is_verbose() {
            tracing::info!(form = %form, "Posting product");
        }

        let body = self.post(&url, Some(form.into_bytes())).await?;
        self.trace_body("post_product", &body);
        envelope::overlay(product, &body)
    }

    async fn fetch_products(&self, url: &str) -> Result<Vec<Product>> {
        let body = self.get(url).await?;
        let products: Vec<WireProduct> = envelope::PRODUCTS.decode_many(&body)?;
        Ok(products.into_iter().map(Product::from).collect())
    }
}

fn product_form(product: &Product) -> FormBody {
    let mut form = FormBody::new()
        .with("arch", product.arch.as_str())
        .with("distri", product.distri.as_str())
        .with("flavor", product.flavor.as_str())
        .with("id", product.id.to_string())
        .with("version", product.version.as_str());
    form.push_settings(&product.settings);
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_form() {
        let mut product = Product {
            arch: "x86_64".to_string(),
            distri: "opensuse".to_string(),
            flavor: "DVD".to_string(),
            version: "Tumbleweed".to_string(),
            ..Product::default()
        };
        product
            .settings
            .insert("ISO_MAXSIZE".to_string(), "4700372992".to_string());
        assert_eq!(
            product_form(&product).encode(),
            "arch=x86_64&distri=opensuse&flavor=DVD&id=0&version=Tumbleweed&settings%5BISO_MAXSIZE%5D=4700372992"
        );
    }
}
