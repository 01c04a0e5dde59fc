//! Landing page

/// HTML served at `/index.html`
///
/// Shows the stream and a button that zooms the camera crop out.
pub const INDEX_HTML: &str = r#"<html>
<head>
<title>MJPEG stream</title>
<script>
function zoomOut() {
    fetch('/zoom', {method: 'POST'})
        .then(response => {
            if (!response.ok) alert('Zoom failed');
        });
}
</script>
</head>
<body>
<h1>MJPEG stream</h1>
<button onclick="zoomOut()">Zoom Out</button><br/>
<img src="stream.mjpg" width="1280" height="720" />
</body>
</html>
"#;
