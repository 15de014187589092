use axum::response::Html;

const HOME_PAGE: &str = include_str!("../../static/home.html");

pub async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

pub async fn health_check() -> &'static str {
    "OK"
}
