//! Full dashboard page shell.

use crate::dashboard::guard::UI_TOKEN_HEADER;
use crate::dashboard::render::escape_html;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

const STYLE: &str = r#"
* { box-sizing: border-box; }
*, *::before, *::after { transition: none !important; animation: none !important; }
body {
  margin: 0;
  min-height: 100vh;
  font-family: "Inter", system-ui, sans-serif;
  color: #E2E8F0;
  background: linear-gradient(135deg, #0F0F1A 0%, #1A1A2E 50%, #16213E 100%);
}
header { padding: 24px 32px 8px; }
header h1 {
  margin: 0;
  font-size: 32px;
  background: linear-gradient(90deg, #8B5CF6, #06B6D4);
  -webkit-background-clip: text;
  background-clip: text;
  color: transparent;
}
header p { margin: 4px 0 0; color: #94A3B8; }
.connection { font-size: 12px; color: #64748B; }
.connection.live { color: #10B981; }
main { padding: 8px 32px 32px; }
.tabs { display: flex; flex-wrap: wrap; gap: 8px; margin: 16px 0; }
.tab {
  display: inline-flex; align-items: center; gap: 6px;
  padding: 8px 14px; border-radius: 8px; cursor: pointer;
  color: #CBD5E1; background: rgba(26, 26, 46, 0.6);
  border: 1px solid rgba(139, 92, 246, 0.2); font-size: 14px;
}
.tab.active { color: #FFFFFF; border-color: #8B5CF6; background: rgba(139, 92, 246, 0.25); }
.delete-badge {
  width: 18px; height: 18px; line-height: 18px; text-align: center;
  border-radius: 50%; background: rgba(239, 68, 68, 0.6); color: #FFFFFF; opacity: 0.7;
}
.delete-badge:hover { opacity: 1; }
.grimoire-panel, .chapter-panel { display: none; }
.grimoire-panel.active, .chapter-panel.active { display: block; }
.plot-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(480px, 1fr)); gap: 16px; }
.plot-card {
  margin: 0; padding: 12px; height: 440px; border-radius: 12px;
  background: rgba(26, 26, 46, 0.6); border: 1px solid rgba(139, 92, 246, 0.15);
}
.plot-card figcaption { font-weight: 600; margin-bottom: 4px; }
.plot-target { height: 400px; }
.invalid-data { display: flex; align-items: center; justify-content: center; height: 400px; color: #F87171; }
.empty-state { padding: 48px; text-align: center; color: #94A3B8; }
"#;

const SCRIPT: &str = r#"
(() => {
  const selection = { grimoire: null, chapters: {} };
  const tokenMeta = document.querySelector('meta[name="grimoire-ui-token"]');
  const uiToken = tokenMeta ? tokenMeta.content : "";
  let socket = null;

  const byData = (root, selector, attr, value) =>
    Array.from(root.querySelectorAll(selector)).find((el) => el.dataset[attr] === value) || null;

  function drawPlots(root) {
    root.querySelectorAll(".plot-card").forEach((card) => {
      const data = card.querySelector("script.plot-data");
      const target = card.querySelector(".plot-target");
      if (!data || !target) return;
      try {
        const figure = JSON.parse(data.textContent);
        Plotly.react(target, figure.data || [], figure.layout || {}, { displaylogo: false, responsive: true });
      } catch (err) {
        target.textContent = "Invalid data";
      }
    });
  }

  function resizeVisible() {
    document.querySelectorAll(".chapter-panel.active .plot-target").forEach((el) => {
      if (el.data) Plotly.Plots.resize(el);
    });
  }

  function applySelection() {
    const dashboard = document.querySelector('[data-region="dashboard"]');
    if (!dashboard) return;
    const grimoireTabs = Array.from(dashboard.querySelectorAll("[data-tab-grimoire]"));
    if (!grimoireTabs.some((tab) => tab.dataset.tabGrimoire === selection.grimoire)) {
      selection.grimoire = grimoireTabs.length ? grimoireTabs[0].dataset.tabGrimoire : null;
    }
    grimoireTabs.forEach((tab) =>
      tab.classList.toggle("active", tab.dataset.tabGrimoire === selection.grimoire));
    dashboard.querySelectorAll('[data-region="grimoire"]').forEach((panel) => {
      const name = panel.dataset.grimoire;
      panel.classList.toggle("active", name === selection.grimoire);
      const chapterTabs = Array.from(panel.querySelectorAll("[data-tab-chapter]"));
      if (!chapterTabs.some((tab) => tab.dataset.tabChapter === selection.chapters[name])) {
        selection.chapters[name] = chapterTabs.length ? chapterTabs[0].dataset.tabChapter : null;
      }
      chapterTabs.forEach((tab) =>
        tab.classList.toggle("active", tab.dataset.tabChapter === selection.chapters[name]));
      panel.querySelectorAll('[data-region="chapter"]').forEach((chapter) =>
        chapter.classList.toggle("active", chapter.dataset.chapter === selection.chapters[name]));
    });
    resizeVisible();
  }

  async function fetchFragment(url) {
    const response = await fetch(url, { headers: { Accept: "text/html" } });
    if (!response.ok) return null;
    const holder = document.createElement("template");
    holder.innerHTML = (await response.text()).trim();
    return holder.content.firstElementChild;
  }

  function swap(current, next) {
    current.replaceWith(next);
    drawPlots(next);
    applySelection();
  }

  async function refreshDashboard() {
    const current = document.querySelector('[data-region="dashboard"]');
    const next = await fetchFragment("/fragments/dashboard");
    if (current && next) swap(current, next);
  }

  async function refreshGrimoire(grimoire) {
    const current = byData(document, '[data-region="grimoire"]', "grimoire", grimoire);
    const next = current && await fetchFragment(`/fragments/grimoire/${encodeURIComponent(grimoire)}`);
    if (current && next) swap(current, next); else await refreshDashboard();
  }

  async function refreshChapter(grimoire, chapter) {
    const panel = byData(document, '[data-region="grimoire"]', "grimoire", grimoire);
    const current = panel && byData(panel, '[data-region="chapter"]', "chapter", chapter);
    const next = current && await fetchFragment(
      `/fragments/grimoire/${encodeURIComponent(grimoire)}/chapter/${encodeURIComponent(chapter)}`);
    if (current && next) swap(current, next); else await refreshGrimoire(grimoire);
  }

  function handleEvent(event) {
    switch (event.kind) {
      case "chapter": return refreshChapter(event.grimoire, event.chapter);
      case "grimoire": return refreshGrimoire(event.grimoire);
      default: return refreshDashboard();
    }
  }

  function connect() {
    const status = document.getElementById("connection");
    const scheme = location.protocol === "https:" ? "wss" : "ws";
    socket = new WebSocket(`${scheme}://${location.host}/ws`);
    socket.onopen = () => {
      status.textContent = "live";
      status.classList.add("live");
      refreshDashboard();
    };
    socket.onmessage = (message) => {
      try { handleEvent(JSON.parse(message.data)); } catch (err) { console.error(err); }
    };
    socket.onclose = () => {
      status.textContent = "reconnecting...";
      status.classList.remove("live");
      setTimeout(connect, 1000);
    };
  }

  async function confirmDelete(grimoire, chapter) {
    const question = chapter === undefined
      ? `Delete grimoire "${grimoire}" and all of its chapters and plots?`
      : `Delete chapter "${chapter}" from "${grimoire}" and all of its plots?`;
    if (!window.confirm(question)) return;
    const url = chapter === undefined
      ? `/ui/grimoire/${encodeURIComponent(grimoire)}/delete`
      : `/ui/grimoire/${encodeURIComponent(grimoire)}/chapter/${encodeURIComponent(chapter)}/delete`;
    const response = await fetch(url, { method: "POST", headers: { "__UI_TOKEN_HEADER__": uiToken } });
    if (!response.ok) {
      const body = await response.json().catch(() => ({}));
      window.alert(body.detail || `Delete failed (${response.status})`);
    }
    if (!socket || socket.readyState !== WebSocket.OPEN) {
      if (chapter === undefined) await refreshDashboard(); else await refreshGrimoire(grimoire);
    }
  }

  document.addEventListener("click", (ev) => {
    const target = ev.target.closest("[data-delete-grimoire], [data-tab-grimoire], [data-tab-chapter]");
    if (!target) return;
    if (target.dataset.deleteGrimoire !== undefined) {
      ev.stopPropagation();
      confirmDelete(target.dataset.deleteGrimoire, target.dataset.deleteChapter);
      return;
    }
    if (target.dataset.tabGrimoire !== undefined) {
      selection.grimoire = target.dataset.tabGrimoire;
    } else {
      const panel = target.closest('[data-region="grimoire"]');
      if (panel) selection.chapters[panel.dataset.grimoire] = target.dataset.tabChapter;
    }
    applySelection();
  });

  drawPlots(document);
  applySelection();
  connect();
})();
"#;

/// Wraps a rendered dashboard region into the complete HTML document.
///
/// `ui_token` is embedded for the page's delete requests.
pub fn render_page(dashboard: &str, ui_token: &str) -> String {
    let script = SCRIPT.replace("__UI_TOKEN_HEADER__", UI_TOKEN_HEADER);
    let ui_token = escape_html(ui_token);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="grimoire-ui-token" content="{ui_token}">
<title>GrimoirePlot - Data Visualization Dashboard</title>
<link rel="icon" href="data:image/svg+xml,<svg xmlns=%22http://www.w3.org/2000/svg%22 viewBox=%220 0 100 100%22><text y=%22.9em%22 font-size=%2290%22>🔮</text></svg>">
<script src="{PLOTLY_CDN}" charset="utf-8"></script>
<style>{STYLE}</style>
</head>
<body>
<header>
<h1>GrimoirePlot</h1>
<p>Live plot dashboard <span id="connection" class="connection">connecting...</span></p>
</header>
<main>
{dashboard}
</main>
<script>{script}</script>
</body>
</html>
"#
    )
}
