// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use showcase_app::{
    ImageAction, ImagePlatform, OverlayController, OverlayEvent, PageChrome, Product, ProductId,
};
use showcase_testkit::RecordingHost;
use showcase_tui::TerminalPlatform;
use std::sync::mpsc;
use std::thread;
use tiny_http::{Header, Response, Server};

const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-a-png";

fn platform_in(dir: &std::path::Path) -> TerminalPlatform {
    let (tx, _rx) = mpsc::channel();
    TerminalPlatform::new(dir, tx)
}

#[test]
fn remote_image_is_fetched_into_downloads_dir() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let url = format!("http://{}/images/mug.png", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/images/mug.png");
        let response = Response::from_data(IMAGE_BYTES.to_vec())
            .with_status_code(200)
            .with_header(
                Header::from_bytes("Content-Type", "image/png").expect("valid content type header"),
            );
        request.respond(response).expect("response should succeed");
    });

    let temp = tempfile::tempdir()?;
    let mut platform = platform_in(temp.path());
    let path = platform.save_download(&url, "product_4.png")?;

    handle.join().expect("server thread should join");
    assert_eq!(path, temp.path().join("product_4.png"));
    assert_eq!(std::fs::read(path)?, IMAGE_BYTES);
    Ok(())
}

#[test]
fn http_error_status_fails_the_download() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let url = format!("http://{}/images/gone.png", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string("missing").with_status_code(404);
        request.respond(response).expect("response should succeed");
    });

    let temp = tempfile::tempdir()?;
    let mut platform = platform_in(temp.path());
    let error = platform
        .save_download(&url, "product_4.png")
        .expect_err("404 should fail");

    handle.join().expect("server thread should join");
    assert!(format!("{error:#}").contains("download"));
    assert!(!temp.path().join("product_4.png").exists());
    Ok(())
}

#[test]
fn menu_download_of_remote_image_reports_saved_path() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let image = format!("http://{}/p/7.png", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_data(IMAGE_BYTES.to_vec()).with_status_code(200);
        request.respond(response).expect("response should succeed");
    });

    let temp = tempfile::tempdir()?;
    let mut platform = platform_in(temp.path());
    let mut host = RecordingHost::new();
    let mut overlay = OverlayController::new(PageChrome::new());
    let product = Product {
        image,
        ..Product::blank(ProductId::new(7))
    };

    overlay.open(Some(product), true);
    overlay.toggle_image_menu();
    let events = overlay.run_image_action(ImageAction::Download, &mut platform);

    handle.join().expect("server thread should join");
    let expected = temp.path().join("product_7.png");
    assert_eq!(
        events,
        vec![
            OverlayEvent::Downloaded(expected.clone()),
            OverlayEvent::ImageMenuToggled(false),
        ]
    );
    assert_eq!(std::fs::read(expected)?, IMAGE_BYTES);
    assert!(host.saved.is_empty());
    assert!(overlay.delete(&mut host)?.contains(&OverlayEvent::Closed));
    Ok(())
}
