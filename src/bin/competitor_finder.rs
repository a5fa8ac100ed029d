use competitive_insights::config::ServiceDefaults;
use competitive_insights::{routes, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::run(
        ServiceDefaults {
            service_name: "competitor-finder",
            port: 8080,
        },
        routes::competitor_router,
    )
    .await
}
