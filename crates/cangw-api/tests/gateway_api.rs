//! End-to-end tests for the gateway HTTP API against a mock CAN bus

mod common;

use common::{read_until, TestServer};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let body = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_status_lists_allowed_messages() {
    let server = TestServer::start().await;
    let status: Value = server
        .client
        .get(server.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status["canStatusMessage"], "Ready to send CAN command 'Lamp_Control'");
    assert_eq!(status["currentMessage"], "Lamp_Control");

    let options = status["messageOptions"].as_array().unwrap();
    let labels: Vec<_> = options.iter().map(|o| o["label"].as_str().unwrap()).collect();
    assert_eq!(labels, vec!["Engine_Status (0xC0)", "Lamp_Control (0x200)"]);
    assert_eq!(options[0]["template"], json!({"Coolant_Temp": 20.0, "Engine_RPM": 0.0}));
    assert_eq!(options[1]["signalNames"], json!(["lamp_on", "brightness"]));
    assert_eq!(options[1]["selected"], true);
}

#[tokio::test]
async fn test_send_can_query() {
    let server = TestServer::start().await;
    let response = server
        .client
        .post(server.url("/send_can?message=lamp%20control&value=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let text = response.text().await.unwrap();
    assert!(text.starts_with("Sent CAN message 'Lamp_Control' (0x200) at "), "{}", text);
    assert!(text.ends_with("data=0x0100"), "{}", text);

    let frame = server.mock.last_frame().unwrap();
    assert_eq!(frame.id(), 0x200);
    assert_eq!(frame.data(), &[0x01, 0x00]);
}

#[tokio::test]
async fn test_send_can_form_with_overrides() {
    let server = TestServer::start().await;
    let text = server
        .client
        .post(server.url("/send_can"))
        .form(&[
            ("message", "Engine_Status"),
            ("payload", r#"{"engine rpm": 1800, "COOLANT_TEMP": "92"}"#),
        ])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.starts_with("Sent CAN message 'Engine_Status' (0xC0)"), "{}", text);
    assert_eq!(server.mock.last_frame().unwrap().data(), &[0x20, 0x1C, 132, 0]);

    // The selection follows the last send
    let status: Value = server
        .client
        .get(server.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["currentMessage"], "Engine_Status");
    assert_eq!(status["canStatusMessage"], Value::String(text));
}

#[tokio::test]
async fn test_send_can_errors_are_status_text() {
    let server = TestServer::start().await;
    let cases = [
        (
            "/send_can?message=Diag_Request&value=1",
            "Message 'Diag_Request' is blocked by the current message filter.",
        ),
        (
            "/send_can?message=Transmission",
            "Message 'Transmission' not found in CAN database.",
        ),
        ("/send_can?message=Lamp_Control&value=bright", "Invalid CAN value 'bright'"),
        (
            "/send_can?message=Lamp_Control&payload=%5B1%5D",
            "Payload overrides must be a JSON object.",
        ),
    ];

    for (path, expected) in cases {
        let response = server.client.post(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), expected);
    }
    assert!(server.mock.sent_frames().is_empty());
}

#[tokio::test]
async fn test_unknown_post_not_recognized() {
    let server = TestServer::start().await;
    let response = server.client.post(server.url("/reboot")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "Command not recognized.");

    let response = server.client.get(server.url("/reboot")).send().await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_status_page() {
    let server = TestServer::start().await;
    let html = server
        .client
        .get(server.url("/"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Ready to send CAN command &#39;Lamp_Control&#39;"));
    assert!(html.contains(r#"data-signal-names="lamp_on,brightness""#));
    assert!(!html.contains("Diag_Request"));
}

#[tokio::test]
async fn test_parameter_binding_round_trip() {
    let server = TestServer::start().await;
    let response: Value = server
        .client
        .put(server.url("/parameters"))
        .json(&json!({"parameters": [{"name": "Lamp_Control.Brightness", "value": 3}]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response["count"], 2);

    let frame = server.mock.last_frame().unwrap();
    assert_eq!(frame.id(), 0x200);
    assert_eq!(frame.data(), &[0x00, 0x03]);

    let param: Value = server
        .client
        .get(server.url("/parameters/Lamp_Control.Brightness"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(param["value"], 3.0);
}

#[tokio::test]
async fn test_explicit_binding() {
    let server = TestServer::start().await;
    let response = server
        .client
        .post(server.url("/parameters/bindings"))
        .json(&json!({"parameter": "dimmer", "message": "lamp control", "signal": "BRIGHTNESS"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let binding: Value = response.json().await.unwrap();
    assert_eq!(
        binding,
        json!({"parameter": "dimmer", "message": "Lamp_Control", "signal": "Brightness"})
    );

    let response = server
        .client
        .put(server.url("/parameters/dimmer"))
        .json(&json!({"value": "42"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(server.mock.last_frame().unwrap().data(), &[0x00, 42]);

    let bindings: Value = server
        .client
        .get(server.url("/parameters/bindings"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(bindings
        .as_array()
        .unwrap()
        .iter()
        .any(|b| b["parameter"] == "dimmer" && b["signal"] == "Brightness"));
}

#[tokio::test]
async fn test_bind_unknown_signal() {
    let server = TestServer::start().await;
    let response = server
        .client
        .post(server.url("/parameters/bindings"))
        .json(&json!({"parameter": "dimmer", "message": "Lamp_Control", "signal": "Hue"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
    assert_eq!(
        body["message"],
        "Signal 'Hue' not found in CAN message 'Lamp_Control'."
    );
}

#[tokio::test]
async fn test_parameter_unencodable_is_stored_not_sent() {
    let server = TestServer::start().await;
    let response = server
        .client
        .put(server.url("/parameters/Lamp_Control.Brightness"))
        .json(&json!({"value": 300}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(server.mock.sent_frames().is_empty());

    let param: Value = server
        .client
        .get(server.url("/parameters/Lamp_Control.Brightness"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(param["value"], 300.0);

    // Above the declared maximum but within 8 bits: sent
    let response = server
        .client
        .put(server.url("/parameters/Lamp_Control.Brightness"))
        .json(&json!({"value": 150}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(server.mock.last_frame().unwrap().data(), &[0, 150]);
}

#[tokio::test]
async fn test_parameter_removal_and_lookup() {
    let server = TestServer::start().await;
    let response = server
        .client
        .put(server.url("/parameters/speed"))
        .json(&json!({"value": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = server.client.get(server.url("/parameters/speed")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Parameter 'speed' not found.");
}

#[tokio::test]
async fn test_subscribe_streams_current_then_updates() {
    let server = TestServer::start().await;
    let mut stream = server
        .client
        .get(server.url("/parameters/subscribe?names=speed"))
        .send()
        .await
        .unwrap();
    assert_eq!(stream.status(), 200);

    let initial = read_until(&mut stream, r#""name":"speed""#).await;
    assert!(initial.contains("event: parameters"), "{}", initial);

    server
        .client
        .put(server.url("/parameters"))
        .json(&json!({"parameters": [
            {"name": "ignored", "value": 1},
            {"name": "speed", "value": 55.5}
        ]}))
        .send()
        .await
        .unwrap();

    let update = read_until(&mut stream, "55.5").await;
    assert!(!update.contains("ignored"), "{}", update);
}

#[tokio::test]
async fn test_database_unavailable() {
    let server = TestServer::start_without_database().await;
    let status: Value = server
        .client
        .get(server.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["canStatusMessage"], "CAN database unavailable.");
    assert_eq!(status["messageOptions"], json!([]));

    let text = server
        .client
        .post(server.url("/send_can?value=1"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(text, "CAN database unavailable.");

    // Parameters keep working without the database
    let response = server
        .client
        .put(server.url("/parameters/speed"))
        .json(&json!({"value": 12}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(!server.link.is_loaded());
}
