mod broker;
mod display;
mod host;
mod http;
mod link;
mod ntp;
mod sensors;
mod store;
mod weather;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
