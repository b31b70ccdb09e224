//! Arabic landing page with a minimal ask form.

use axum::{Router, response::Html, routing::get};

use crate::server::GatewayState;

const HOME_PAGE: &str = r##"<!DOCTYPE html>
<html dir="rtl" lang="ar">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>TawjihiAI</title>
<style>
  body { font-family: Tahoma, Arial, sans-serif; max-width: 760px; margin: 2rem auto; padding: 0 1rem; }
  select, textarea, button { width: 100%; font-size: 1rem; margin: .4rem 0; padding: .5rem; }
  #answer { white-space: pre-wrap; background: #f5f5f5; padding: 1rem; border-radius: 6px; min-height: 3rem; }
</style>
</head>
<body>
<h1>🎓 نظام التوجيهي الذكي</h1>
<p>WebSocket: <code>ws://HOST/ws/USER_ID/AGENT_ID</code></p>
<form id="ask">
  <label for="subject">المادة</label>
  <select id="subject">
    <option value="math">الرياضيات</option>
    <option value="arabic">اللغة العربية</option>
    <option value="english">اللغة الإنجليزية</option>
  </select>
  <label for="question">السؤال</label>
  <textarea id="question" rows="4"></textarea>
  <button type="submit">اسأل</button>
</form>
<div id="answer"></div>
<script>
const userId = localStorage.getItem("tawjihi_user") || crypto.randomUUID();
localStorage.setItem("tawjihi_user", userId);
document.getElementById("ask").addEventListener("submit", async (e) => {
  e.preventDefault();
  const out = document.getElementById("answer");
  out.textContent = "جاري التفكير...";
  const res = await fetch("/api/ask", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({
      subject: document.getElementById("subject").value,
      question: document.getElementById("question").value,
      user_id: userId,
    }),
  });
  const data = await res.json();
  out.textContent = res.ok ? data.response : data.detail;
});
</script>
</body>
</html>
"##;

pub fn home_router() -> Router<GatewayState> {
    Router::new().route("/", get(|| async { Html(HOME_PAGE) }))
}
