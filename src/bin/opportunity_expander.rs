use competitive_insights::config::ServiceDefaults;
use competitive_insights::{routes, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::run(
        ServiceDefaults {
            service_name: "opportunity-expander",
            port: 8081,
        },
        routes::opportunity_router,
    )
    .await
}
