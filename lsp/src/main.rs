#[tokio::main]
async fn main() {
    flowls_lsp::run().await;
}
