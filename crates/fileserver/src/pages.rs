//! HTML pages for browsing and playback

use crate::listing::{Listing, Playlist};
use crate::stream::VIDEO_CONTENT_TYPE;
use crate::token::PathToken;
use crate::utils::escape_html;

/// Title shown on the root listing
pub const ARCHIVE_TITLE: &str = "My Movie Archives";

const STYLE: &str = "body{font-family:sans-serif;margin:2em;background:#111;color:#eee}\
a{color:#8cf;text-decoration:none}a:hover{text-decoration:underline}\
ul{list-style:none;padding:0}li{padding:.3em 0}\
video{width:100%;max-height:80vh;background:#000}\
.current{font-weight:bold;color:#fc6}.nav a{margin-right:1.5em}";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        title = escape_html(title),
    )
}

/// Render a directory listing
///
/// `title` is the browsed directory, or [`ARCHIVE_TITLE`] at the top level.
pub fn render_listing(title: &str, listing: &Listing) -> String {
    let mut body = format!("<h1>{}</h1>\n", escape_html(title));

    if let Some(parent) = &listing.parent {
        body.push_str(&format!(
            "<p class=\"nav\"><a href=\"/?dir={}\">&#8593; Up</a> <a href=\"/\">Home</a></p>\n",
            parent
        ));
    } else if title != ARCHIVE_TITLE {
        body.push_str("<p class=\"nav\"><a href=\"/\">Home</a></p>\n");
    }

    body.push_str("<ul>\n");
    for dir in &listing.directories {
        body.push_str(&format!(
            "<li>&#128193; <a href=\"/?dir={}\">{}</a></li>\n",
            dir.token(),
            escape_html(&dir.name)
        ));
    }
    for file in &listing.files {
        body.push_str(&format!(
            "<li>&#127916; <a href=\"/player?path={}\">{}</a></li>\n",
            file.token(),
            escape_html(&file.name)
        ));
    }
    body.push_str("</ul>\n");

    if listing.directories.is_empty() && listing.files.is_empty() {
        body.push_str("<p>Nothing to play here.</p>\n");
    }

    page(title, &body)
}

/// Render the player page for the current entry of `playlist`
///
/// `token` is the token the player was opened with and feeds the video
/// element's source.
pub fn render_player(filename: &str, token: &PathToken, playlist: &Playlist) -> String {
    let mut body = format!("<h1>{}</h1>\n", escape_html(filename));

    body.push_str(&format!(
        "<video controls autoplay preload=\"metadata\">\n\
         <source src=\"/video-stream?path={}\" type=\"{}\">\n</video>\n",
        token, VIDEO_CONTENT_TYPE
    ));

    body.push_str("<p class=\"nav\">");
    if let Some(prev) = playlist.previous() {
        body.push_str(&format!(
            "<a href=\"/player?path={}\">&#9664; {}</a>",
            prev.token,
            escape_html(&prev.name)
        ));
    }
    body.push_str(&format!(
        "<a href=\"/?dir={}\">Back to folder</a>",
        playlist.directory
    ));
    if let Some(next) = playlist.next() {
        body.push_str(&format!(
            "<a href=\"/player?path={}\">{} &#9654;</a>",
            next.token,
            escape_html(&next.name)
        ));
    }
    body.push_str("</p>\n");

    body.push_str("<h2>Playlist</h2>\n<ol>\n");
    for (i, entry) in playlist.entries.iter().enumerate() {
        let class = if Some(i) == playlist.index { " class=\"current\"" } else { "" };
        body.push_str(&format!(
            "<li{}><a href=\"/player?path={}\">{}</a></li>\n",
            class,
            entry.token,
            escape_html(&entry.name)
        ));
    }
    body.push_str("</ol>\n");

    if let Some(next) = playlist.next() {
        // Advance when the current video ends
        body.push_str(&format!(
            "<script>document.querySelector('video').addEventListener('ended',\
             function(){{window.location='/player?path={}';}});</script>\n",
            next.token
        ));
    }

    page(filename, &body)
}
