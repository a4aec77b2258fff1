//! HTML pages, rendered with maud. Every interpolated value is escaped.

use burnlink_core::IssueResult;
use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:40rem;margin:3rem auto;padding:0 1rem}\
.error{color:#b00020}.payload{white-space:pre-wrap;word-break:break-all;background:#f4f4f4;padding:1rem}\
img{image-rendering:pixelated;max-width:100%}";

fn layout(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body { (body) }
        }
    }
    .into_string()
}

/// Upload form, optionally with an error from the previous attempt.
pub fn index(error: Option<&str>) -> String {
    layout(
        "burnlink",
        html! {
            h1 { "Single-use QR" }
            @if let Some(error) = error {
                p.error { (error) }
            }
            form method="post" action="/" enctype="multipart/form-data" {
                input type="file" name="qrfile" accept="image/png,image/jpeg";
                button type="submit" { "Create one-time link" }
            }
        },
    )
}

/// Result of a successful upload.
pub fn issued(result: &IssueResult) -> String {
    layout(
        "Your one-time link",
        html! {
            h1 { "Your one-time link" }
            p { a href=(result.redemption_url) { (result.redemption_url) } }
            p { img src=(result.artifact_data_url()) alt="One-time QR code"; }
            h2 { "Original content" }
            p.payload { (result.original_payload) }
            p { a href="/" { "Upload another" } }
        },
    )
}

/// The revealed text payload of a first redemption.
pub fn revealed(payload: &str) -> String {
    layout(
        "Content",
        html! {
            h1 { "Content" }
            p.payload { (payload) }
        },
    )
}

/// A plain status message (unknown link, used link, outage).
pub fn message(text: &str) -> String {
    layout("burnlink", html! { p { (text) } })
}
