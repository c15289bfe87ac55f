//! Binary entry point. Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    media_cms_backend::run().await;
}
