use std::time::Duration;

use serde::Deserialize;
use statuspage_http::{ProviderConfig, RequestContext, StatuspageClient};

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Component {
    name: String,
    status: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ProviderConfig::from_env().map_err(anyhow::Error::msg)?;
    let client = StatuspageClient::new(config)?;
    let ctx = RequestContext::new().with_timeout(Duration::from_secs(120));

    let pages: Vec<Page> = client.get(&ctx, "pages").await?;
    for page in pages {
        println!("{} ({})", page.name, page.id);

        let components: Vec<Component> = client
            .get(&ctx, &format!("pages/{}/components", page.id))
            .await?;
        for component in components {
            println!("  {}: {}", component.name, component.status);
        }
    }

    Ok(())
}
