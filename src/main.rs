use std::sync::Arc;

use mediahub::{
    models::{MediaItem, MovieQuery},
    services::RemoteApi,
    state::WatchlistSet,
    views::ListingView,
    AppContext, Config, HttpRemoteClient, TracingNotifier,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mediahub=info"));
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn print_item(item: &MediaItem, on_watchlist: bool) {
    let rating = item
        .average_rating
        .map(|avg| format!("{:.1}/10", avg))
        .unwrap_or_else(|| "no ratings".to_string());
    let year = item
        .release_year
        .map(|year| format!(" ({})", year))
        .unwrap_or_default();
    let marker = if on_watchlist { "*" } else { " " };

    println!(
        "{} [{}] {}{} - {} from {} reviews",
        marker, item.id, item.title, year, rating, item.review_count
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    let remote: Arc<dyn RemoteApi> = Arc::new(HttpRemoteClient::from_config(&config)?);
    let context = AppContext::new(config.viewer(), Arc::new(TracingNotifier));

    tracing::info!(
        api_url = %config.api_url,
        signed_in = context.is_authenticated(),
        "MediaHub client starting"
    );

    if let Some(keyword) = std::env::args().nth(1) {
        let watchlist = WatchlistSet::new(remote.clone(), context.clone());
        if context.is_authenticated() {
            watchlist.load().await?;
        }

        let results = remote.search_movies(&keyword).await?;
        for item in &results {
            print_item(item, watchlist.is_member(item.id));
        }
        return Ok(());
    }

    let view = ListingView::new(
        remote,
        context,
        MovieQuery::new(Some(config.default_media_type), config.default_sort),
    );
    view.mount().await?;

    for item in view.items() {
        print_item(&item, view.is_on_watchlist(item.id));
    }

    Ok(())
}
