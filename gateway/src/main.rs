mod describe;
mod inference;
mod server;
#[cfg(test)]
mod test_support;
mod weather;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::run().await
}
