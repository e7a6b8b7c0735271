//! Page fixtures and mock server routes

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Listing page linking to the given item ids, in order
pub fn listing_page(ids: &[u64]) -> String {
    let mut body = String::from("<html><body><div class=\"imageWall5Floaters\">\n");
    for id in ids {
        body.push_str(&format!(
            "<div class=\"floatHelp\"><a href=\"https://steamcommunity.com/sharedfiles/filedetails/?id={}\" class=\"profile_media_item modalContentLink\">\n</a></div>\n",
            id
        ));
    }
    body.push_str("</div></body></html>");
    body
}

/// Detail page whose full-size link points at `asset_url`
pub fn detail_page(asset_url: &str) -> String {
    format!(
        "<html><body><div class=\"actualmediactn\">\n<a href=\"{}\" target=\"_blank\" rel=\"noreferrer\">\n<img src=\"{}?imw=5000\"></a>\n</div></body></html>",
        asset_url, asset_url
    )
}

/// Asset URL served by `server` for a local identifier
pub fn asset_url(server: &MockServer, local_id: &str) -> String {
    format!("{}/ugc/{}/ABCDEF0123/", server.uri(), local_id)
}

/// Serve `ids` on listing page `page` of `category`
pub async fn mount_listing(server: &MockServer, account: u64, category: &str, page: u32, ids: &[u64]) {
    Mock::given(method("GET"))
        .and(path(format!("/profiles/{}/{}", account, category)))
        .and(query_param("p", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(ids)))
        .mount(server)
        .await;
}

/// Serve an empty page for every other listing request.
///
/// Mount after the specific pages; earlier mocks take precedence.
pub async fn mount_listing_fallback(server: &MockServer, account: u64, category: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/profiles/{}/{}", account, category)))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[])))
        .mount(server)
        .await;
}

/// Serve a detail page for `id` linking to `asset_url`
pub async fn mount_detail(server: &MockServer, id: u64, asset_url: &str) {
    Mock::given(method("GET"))
        .and(path("/sharedfiles/filedetails/"))
        .and(query_param("id", id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(asset_url)))
        .mount(server)
        .await;
}

/// Serve `bytes` with `content_type` for the asset of `local_id`
pub async fn mount_asset(server: &MockServer, local_id: &str, content_type: &str, bytes: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/ugc/{}/ABCDEF0123/", local_id)))
        .respond_with(ResponseTemplate::new(200).set_body_raw(bytes.to_vec(), content_type))
        .mount(server)
        .await;
}

/// Detail page plus asset for an item that downloads cleanly
pub async fn mount_item(server: &MockServer, id: u64, local_id: &str, content_type: &str, bytes: &[u8]) {
    let url = asset_url(server, local_id);
    mount_detail(server, id, &url).await;
    mount_asset(server, local_id, content_type, bytes).await;
}
