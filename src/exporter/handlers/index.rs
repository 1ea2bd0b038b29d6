use axum::{extract::Extension, response::Html};

/// Where the scrape endpoint is mounted, shared with the landing page.
#[derive(Clone, Debug)]
pub struct TelemetryPath(pub String);

pub async fn index(Extension(TelemetryPath(path)): Extension<TelemetryPath>) -> Html<String> {
    Html(render(&path))
}

fn render(path: &str) -> String {
    format!(
        "<html>\n\
         <head><title>ClickHouse Exporter</title></head>\n\
         <body>\n\
         <h1>ClickHouse Exporter</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n"
    )
}
