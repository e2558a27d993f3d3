/// Liveness probe. No dependencies are touched.
pub async fn ping_handler() -> &'static str {
    "pong 🏓"
}
