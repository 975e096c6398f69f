#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    attestation_overlay_server::run().await
}
