use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get as get_route;
use axum::{Json, Router};
use serde_json::{Value, json};

mod common;
use common::{
    BAY_STATE_ADDRESS, BOSTON_ZIP, KINGSTON_ADDRESS, LOWELL_ADDRESS, SAN_FRANCISCO_ADDRESS, create_program, get,
    setup_app, setup_app_with,
};

use campdir::config::{GeocoderConfig, GeocoderProvider, QueryConfig};
use campdir::geo::DistanceUnit;
use campdir::{GeoConfig, MemoryStore, build_geocoder};

async fn seeded_app() -> Router {
    let app = setup_app();
    create_program(&app, "Bay State Bootcamp", BAY_STATE_ADDRESS).await;
    create_program(&app, "Lowell Code School", LOWELL_ADDRESS).await;
    create_program(&app, "Kingston Dev Academy", KINGSTON_ADDRESS).await;
    create_program(&app, "Golden Gate Coders", SAN_FRANCISCO_ADDRESS).await;
    app
}

fn names(body: &Value) -> Vec<String> {
    let mut names: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_created_program_has_geojson_location() {
    let app = setup_app();
    let id = create_program(&app, "Bay State Bootcamp", BAY_STATE_ADDRESS).await;

    let (status, body) = get(&app, &format!("/api/v1/programs/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let location = &body["data"]["location"];
    assert_eq!(location["type"], "Point");
    assert_eq!(location["coordinates"], json!([-71.1003, 42.3505]));
    assert_eq!(location["formattedAddress"], BAY_STATE_ADDRESS);
    assert!(body["data"].get("address").is_none());
}

#[tokio::test]
async fn test_radius_grows_with_distance() {
    let app = seeded_app().await;

    let (status, body) = get(&app, &format!("/api/v1/programs/radius/{BOSTON_ZIP}/10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 1);
    assert!(body.get("pagination").is_none());
    assert_eq!(names(&body), vec!["Bay State Bootcamp"]);

    let (_, body) = get(&app, &format!("/api/v1/programs/radius/{BOSTON_ZIP}/50")).await;
    assert_eq!(names(&body), vec!["Bay State Bootcamp", "Lowell Code School"]);

    let (_, body) = get(&app, &format!("/api/v1/programs/radius/{BOSTON_ZIP}/150")).await;
    assert_eq!(body["count"], 3);

    let (_, body) = get(&app, &format!("/api/v1/programs/radius/{BOSTON_ZIP}/0")).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_radius_in_miles() {
    let store = Arc::new(MemoryStore::new());
    let geo = GeoConfig {
        unit: DistanceUnit::Miles,
        earth_radius: DistanceUnit::Miles.earth_radius(),
    };
    let app = setup_app_with(store, Arc::new(common::fixture_geocoder()), QueryConfig::default(), geo);
    create_program(&app, "Bay State Bootcamp", BAY_STATE_ADDRESS).await;
    create_program(&app, "Lowell Code School", LOWELL_ADDRESS).await;
    create_program(&app, "Kingston Dev Academy", KINGSTON_ADDRESS).await;

    // Lowell is about 25 miles out, Kingston about 64.
    let (_, body) = get(&app, &format!("/api/v1/programs/radius/{BOSTON_ZIP}/30")).await;
    assert_eq!(names(&body), vec!["Bay State Bootcamp", "Lowell Code School"]);
}

#[tokio::test]
async fn test_bad_distance_is_rejected() {
    let app = seeded_app().await;

    for distance in ["far", "-5", "NaN", "inf"] {
        let (status, body) = get(&app, &format!("/api/v1/programs/radius/{BOSTON_ZIP}/{distance}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{distance}: {body}");
    }
}

#[tokio::test]
async fn test_unknown_zipcode_is_not_found() {
    let app = seeded_app().await;

    let (status, body) = get(&app, "/api/v1/programs/radius/99999/10").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("99999"));
}

#[tokio::test]
async fn test_radius_route_only_on_programs() {
    let app = seeded_app().await;

    let (status, _) = get(&app, &format!("/api/v1/courses/radius/{BOSTON_ZIP}/10")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Minimal MapQuest stand-in: knows the Boston zipcode, nothing else.
async fn spawn_fake_mapquest() -> String {
    async fn address(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let locations = if params.get("location").map(String::as_str) == Some(BOSTON_ZIP) {
            json!([{
                "latLng": {"lat": 42.3389, "lng": -71.0726},
                "street": "",
                "adminArea5": "Boston",
                "adminArea3": "MA",
                "postalCode": BOSTON_ZIP,
                "adminArea1": "US"
            }])
        } else {
            json!([])
        };
        Json(json!({"results": [{"locations": locations}]}))
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/geocoding/v1/address", get_route(address));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

fn mapquest_app(base_url: String) -> Router {
    let geocoder = build_geocoder(&GeocoderConfig {
        provider: GeocoderProvider::Mapquest,
        api_key: Some("test-key".to_string()),
        base_url,
        fixtures: None,
    })
    .unwrap();
    setup_app_with(
        Arc::new(MemoryStore::new()),
        geocoder,
        QueryConfig::default(),
        GeoConfig::default(),
    )
}

#[tokio::test]
async fn test_http_geocoder_resolves_center() {
    let app = mapquest_app(spawn_fake_mapquest().await);

    let (status, body) = get(&app, &format!("/api/v1/programs/radius/{BOSTON_ZIP}/10")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["count"], 0);

    let (status, _) = get(&app, "/api/v1/programs/radius/00000/10").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unreachable_geocoder_is_bad_gateway() {
    // Grab a free port, then close it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = mapquest_app(format!("http://{addr}/"));
    let (status, body) = get(&app, &format!("/api/v1/programs/radius/{BOSTON_ZIP}/10")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "The geocoding service is unavailable");
}
