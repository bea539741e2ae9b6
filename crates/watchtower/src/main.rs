#[tokio::main]
async fn main() {
    watchtower::start(std::env::args()).await;
}
