use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use entertainhub::catalog::{
    AnimeSource, CatalogBrowser, CatalogItem, CatalogQuery, CatalogSource, Endpoint, LoadState,
    MoviesSource, MusicSource, RapidApiClient, SeriesSource, SeriesStatus, ServerSort, SortKey,
};
use entertainhub::error::ClientError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const KEY: &str = "test-key";

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn gateway_ok(headers: &HeaderMap) -> bool {
    headers.get("x-rapidapi-key").and_then(|v| v.to_str().ok()) == Some(KEY)
        && headers.get("x-rapidapi-host").and_then(|v| v.to_str().ok()) == Some("127.0.0.1")
}

fn client() -> RapidApiClient {
    RapidApiClient::new(KEY, Duration::from_secs(5)).expect("client")
}

fn top_movies() -> Value {
    json!([
        { "rank": 1, "id": "top1", "title": "The Shawshank Redemption", "rating": "9.3",
          "year": 1994, "genre": ["Drama"] },
        { "rank": 2, "id": "top2", "title": "The Godfather", "rating": "9.2",
          "year": 1972, "genre": ["Crime", "Drama"] },
        { "rank": 3, "id": "top3", "title": "The Dark Knight", "rating": "9.0",
          "year": 2008, "genre": ["Action", "Crime", "Drama"] }
    ])
}

async fn movies_list(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !gateway_ok(&headers) {
        return (StatusCode::FORBIDDEN, Json(json!({ "message": "bad key" })));
    }
    (StatusCode::OK, Json(top_movies()))
}

async fn movie_detail(headers: HeaderMap, Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if !gateway_ok(&headers) {
        return (StatusCode::FORBIDDEN, Json(json!({ "message": "bad key" })));
    }
    match top_movies()
        .as_array()
        .and_then(|all| all.iter().find(|m| m["id"] == json!(id)).cloned())
    {
        Some(movie) => (StatusCode::OK, Json(movie)),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "not found" }))),
    }
}

#[tokio::test]
async fn movies_send_gateway_headers_and_map_missing_detail() {
    let base = serve(
        Router::new()
            .route("/", get(movies_list))
            .route("/:id", get(movie_detail)),
    )
    .await;
    let endpoint = Endpoint::new(&base).expect("endpoint");

    let source = MoviesSource::new(client(), endpoint.clone());
    let page = source.fetch(&CatalogQuery::default()).await.expect("movies");
    assert_eq!(page.items.len(), 3);
    assert!(!page.has_more);
    assert_eq!(page.items[1].title(), "The Godfather");

    let detail = source.fetch_one("top3").await.expect("detail");
    assert_eq!(detail.rating(), Some(9.0));
    assert!(matches!(
        source.fetch_one("top404").await,
        Err(ClientError::NotFound(ref what)) if what == "movie top404"
    ));

    let wrong_key = MoviesSource::new(
        RapidApiClient::new("nope", Duration::from_secs(5)).expect("client"),
        endpoint,
    );
    let err = wrong_key
        .fetch(&CatalogQuery::default())
        .await
        .expect_err("forbidden");
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(err.to_string(), "Failed to fetch movies");
}

#[tokio::test]
async fn series_derive_fields_from_upstream_years() {
    let base = serve(Router::new().route(
        "/series/",
        get(|| async {
            Json(json!([
                { "rank": 1, "title": "Breaking Bad", "year": "2008-2013", "rating": "9.5",
                  "genre": ["Crime", "Drama"] },
                { "rank": 20, "id": "s2", "title": "Someday", "year": "2999" }
            ]))
        }),
    ))
    .await;
    let source = SeriesSource::new(client(), Endpoint::new(&base).expect("endpoint"));
    let page = source.fetch(&CatalogQuery::default()).await.expect("series");
    let series = page
        .items
        .iter()
        .map(|item| match item {
            CatalogItem::Series(s) => s.clone(),
            other => panic!("expected series, got {other:?}"),
        })
        .collect::<Vec<_>>();
    assert_eq!(series[0].id, "series-0");
    assert_eq!(series[0].seasons, Some(5));
    assert_eq!(series[0].status, Some(SeriesStatus::Ended));
    assert!(series[0].featured);
    assert_eq!(series[1].status, Some(SeriesStatus::Upcoming));
    assert!(!series[1].featured);
}

#[tokio::test]
async fn series_detail_keeps_upstream_ids_that_look_generated() {
    let base = serve(Router::new().route(
        "/series/:id",
        get(|Path(id): Path<String>| async move {
            if id == "tt1" {
                Json(json!({ "id": "series-pilot", "title": "Pilot", "year": "2010-2012" }))
            } else {
                Json(json!({ "title": "Nameless", "year": "2001" }))
            }
        }),
    ))
    .await;
    let source = SeriesSource::new(client(), Endpoint::new(&base).expect("endpoint"));
    assert_eq!(source.fetch_one("tt1").await.expect("tt1").id(), "series-pilot");
    assert_eq!(source.fetch_one("tt2").await.expect("tt2").id(), "tt2");
}

#[tokio::test]
async fn browser_shows_failure_and_recovers_on_retry() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route(
            "/",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                    (StatusCode::BAD_GATEWAY, Json(json!({ "message": "upstream down" })))
                } else {
                    (StatusCode::OK, Json(top_movies()))
                }
            }),
        )
        .with_state(hits.clone());
    let base = serve(app).await;
    let source = Arc::new(MoviesSource::new(client(), Endpoint::new(&base).expect("endpoint")));
    let mut browser = CatalogBrowser::new(source);

    let err = browser
        .load(CatalogQuery::default())
        .await
        .expect_err("first call fails");
    assert!(err.is_retryable());
    assert_eq!(browser.state(), &LoadState::Failed("Failed to fetch movies".to_string()));
    assert!(browser.visible().is_empty());

    browser.retry().await.expect("retry");
    assert_eq!(browser.state(), &LoadState::Loaded);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    browser.set_sort(SortKey::Newest);
    let years = browser
        .visible()
        .iter()
        .filter_map(CatalogItem::year)
        .collect::<Vec<_>>();
    assert_eq!(years, [2008, 1994, 1972]);
}

type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn anime_list(
    State(seen): State<Seen>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    seen.lock().unwrap().push(params);
    Json(json!({
        "data": [
            { "_id": "21", "title": "One Piece", "ranking": 40, "genres": ["Action", "Adventure"],
              "episodes": 1100, "type": "TV", "status": "Currently Airing" },
            { "_id": "5114", "title": "Fullmetal Alchemist: Brotherhood", "ranking": 1,
              "genres": ["Action"], "episodes": 64, "type": "TV" }
        ],
        "meta": { "page": 1, "size": 20, "totalData": 45, "totalPage": 3 }
    }))
}

async fn anime_by_id(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == "21" {
        (StatusCode::OK, Json(json!({ "_id": "21", "title": "One Piece", "ranking": 40 })))
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "message": "not found" })))
    }
}

async fn anime_by_ranking(Path(rank): Path<String>) -> (StatusCode, Json<Value>) {
    if rank == "1" {
        (
            StatusCode::OK,
            Json(json!({ "_id": "5114", "title": "Fullmetal Alchemist: Brotherhood", "ranking": 1 })),
        )
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "message": "not found" })))
    }
}

#[tokio::test]
async fn anime_paginates_upstream_and_falls_back_to_ranking() {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/anime", get(anime_list))
        .route("/anime/by-id/:id", get(anime_by_id))
        .route("/anime/by-ranking/:rank", get(anime_by_ranking))
        .route(
            "/genre",
            get(|| async { Json(json!([{ "_id": "Drama" }, { "_id": "Action" }, { "_id": "Comedy" }])) }),
        )
        .with_state(seen.clone());
    let base = serve(app).await;
    let source = AnimeSource::new(client(), Endpoint::new(&base).expect("endpoint"));

    let query = CatalogQuery {
        page: 2,
        search: Some("piece".to_string()),
        genre: Some("Action".to_string()),
        sort: Some(ServerSort {
            field: "episodes".to_string(),
            descending: true,
        }),
        ..CatalogQuery::default()
    };
    let page = source.fetch(&query).await.expect("anime");
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_pages, Some(3));
    assert!(page.has_more);
    assert_eq!(page.items[0].rank(), Some(40));

    let params = seen.lock().unwrap()[0].clone();
    assert_eq!(params["page"], "2");
    assert_eq!(params["size"], "20");
    assert_eq!(params["search"], "piece");
    assert_eq!(params["genres"], "Action");
    assert_eq!(params["sortBy"], "episodes");
    assert_eq!(params["sortOrder"], "desc");
    assert!(!params.contains_key("status"));

    assert_eq!(source.fetch_one("21").await.expect("by id").title(), "One Piece");
    assert_eq!(
        source.fetch_one("1").await.expect("by ranking").id(),
        "5114"
    );
    assert!(matches!(
        source.fetch_one("999").await,
        Err(ClientError::NotFound(_))
    ));

    assert_eq!(
        source.genres().await.expect("genres"),
        ["Action", "Comedy", "Drama"]
    );
}

async fn song_search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let q = params.get("q").cloned().unwrap_or_default();
    let count = if page == 1 { 20 } else { 3 };
    let hits = (0..count)
        .map(|i| {
            json!({
                "result": {
                    "id": page * 100 + i,
                    "title": format!("{q} song {page}-{i}"),
                    "artist_names": "Various",
                    "stats": { "pageviews": 1_500_000 }
                }
            })
        })
        .collect::<Vec<_>>();
    Json(json!({ "hits": hits }))
}

#[tokio::test]
async fn music_pages_accumulate_until_a_short_page() {
    let base = serve(Router::new().route("/search/", get(song_search))).await;
    let source = Arc::new(MusicSource::new(client(), Endpoint::new(&base).expect("endpoint")));
    let mut browser = CatalogBrowser::new(source.clone());

    browser.load(CatalogQuery::default()).await.expect("first page");
    assert!(browser.has_more());
    assert_eq!(browser.items()[0].title(), "popular song 1-0");

    assert!(browser.next_page().await.expect("second page"));
    assert_eq!(browser.items().len(), 23);
    assert!(!browser.has_more());
    assert!(!browser.next_page().await.expect("exhausted"));

    match &browser.items()[22] {
        CatalogItem::Music(track) => {
            assert_eq!(track.plays, "1.5M");
            assert_eq!(track.album.as_deref(), Some("Single"));
        }
        other => panic!("expected a track, got {other:?}"),
    }

    let one = source.fetch_one("102").await.expect("detail");
    assert_eq!(one.id(), "100");
}
