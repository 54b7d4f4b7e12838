use leptos::callback::{Callable, Callback};
use leptos::ev;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos::web_sys::Node;
use tracing::{debug, trace, warn};
use wasm_bindgen::JsCast;

use crate::api::{BlinkoClient, FetchError, TagSource};
use crate::browser::{self, FetchTransport};
use crate::config::{STATUS_ERROR_TTL, STATUS_SUCCESS_TTL};
use crate::editor_core::{apply_markdown_command, EditorSnapshot, MarkdownCommand, ToolbarAction};
use crate::page_link::page_link;
use crate::shortcuts::{resolve_shortcut, KeyChord, ShortcutAction};
use crate::tags::{
    Affordance, CloseReason, Expansion, LoadTicket, NodeKey, OutlineRenderer, PanelState,
    TagPanel, TreeRenderer, TreeRow, AFFORDANCE_WIDTH_PX,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StatusKind {
    Loading,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Status {
    kind: StatusKind,
    message: String,
}

fn persist_draft(text: String) {
    if text.trim().is_empty() {
        return;
    }
    spawn_local(async move {
        if let Err(err) = browser::save_draft(&text).await {
            warn!(error = %err, "failed to save quick note draft");
        }
    });
}

struct TagTreeView {
    on_toggle: Callback<NodeKey>,
    on_select: Callback<NodeKey>,
}

impl TreeRenderer for TagTreeView {
    type Output = AnyView;

    fn empty(&mut self) -> AnyView {
        view! {
            <div class="tag-empty-message" style="padding: 0.75rem; color: var(--text-muted); text-align: center;">
                "No tags available"
            </div>
        }
        .into_any()
    }

    fn rows(&mut self, rows: Vec<TreeRow<'_>>) -> AnyView {
        let on_toggle = self.on_toggle;
        let on_select = self.on_select;
        let slot = format!("display: inline-block; width: {AFFORDANCE_WIDTH_PX}px; flex-shrink: 0;");

        rows.into_iter()
            .map(|row| {
                let key = row.key;
                let affordance = match row.affordance {
                    Affordance::Expander(expansion) => {
                        let class = if expansion == Expansion::Expanded {
                            "tag-expand-btn expanded"
                        } else {
                            "tag-expand-btn"
                        };
                        view! {
                            <button
                                class=class
                                style=format!("{slot} padding: 0; border: none; background: transparent; cursor: pointer; color: var(--text-muted);")
                                aria-label="Expand or collapse"
                                on:click=move |ev| {
                                    ev.stop_propagation();
                                    on_toggle.run(key);
                                }
                            >
                                {row.affordance.glyph()}
                            </button>
                        }
                        .into_any()
                    }
                    Affordance::Spacer => view! { <span class="tag-spacer" style=slot.clone()></span> }.into_any(),
                };
                let row_class = if row.active { "tag-item expanded" } else { "tag-item" };
                let icon = row
                    .icon
                    .map(|icon| view! { <span class="tag-icon" style="margin-right: 0.25rem;">{icon.to_string()}</span> });

                view! {
                    <div
                        class=row_class
                        data-tag-id=row.id.to_string()
                        title=row.path.to_string()
                        style=format!("display: flex; align-items: center; gap: 0.25rem; padding: 0.2rem 0.5rem 0.2rem {}px;", row.indent_px + 8)
                    >
                        {affordance}
                        <div
                            class="tag-content"
                            style="flex: 1; cursor: pointer; border-radius: var(--radius-md); padding: 0.1rem 0.35rem;"
                            on:click=move |ev| {
                                ev.stop_propagation();
                                on_select.run(key);
                            }
                        >
                            {icon}
                            <span class="tag-name">{row.name.to_string()}</span>
                        </div>
                    </div>
                }
            })
            .collect_view()
            .into_any()
    }
}

#[component]
pub fn App() -> impl IntoView {
    let textarea = NodeRef::<html::Textarea>::new();
    let panel_ref = NodeRef::<html::Div>::new();
    let tag_button = NodeRef::<html::Button>::new();

    let (note, set_note) = signal(String::new());
    let (status, set_status) = signal(None::<Status>);
    let status_seq = StoredValue::new(0u64);
    let panel = RwSignal::new(TagPanel::new());

    Effect::new(move |_| {
        spawn_local(async move {
            match browser::load_draft().await {
                Ok(Some(text)) => set_note.set(text),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "failed to restore quick note draft"),
            }
        });
    });

    let show_status = move |kind: StatusKind, message: String| {
        let seq = status_seq.get_value() + 1;
        status_seq.set_value(seq);
        set_status.set(Some(Status { kind, message }));
        let ttl = match kind {
            StatusKind::Loading => None,
            StatusKind::Success => Some(STATUS_SUCCESS_TTL),
            StatusKind::Error => Some(STATUS_ERROR_TTL),
        };
        if let Some(ttl) = ttl {
            set_timeout(
                move || {
                    if status_seq.get_value() == seq {
                        set_status.set(None);
                    }
                },
                ttl,
            );
        }
    };

    let apply_command = move |command: MarkdownCommand| {
        let Some(field) = textarea.get_untracked() else {
            return;
        };
        let start = field.selection_start().ok().flatten().unwrap_or(0);
        let end = field.selection_end().ok().flatten().unwrap_or(start);
        let mut snapshot = EditorSnapshot::from_field(field.value(), start, end);
        match apply_markdown_command(&mut snapshot, command) {
            Ok(true) => {
                field.set_value(&snapshot.text);
                let (start, end) = snapshot.field_selection();
                let _ = field.set_selection_range(start, end);
                let _ = field.focus();
                set_note.set(snapshot.text.clone());
                persist_draft(snapshot.text);
            }
            Ok(false) => {}
            Err(err) => warn!(error = %err, "editor command rejected"),
        }
    };

    let load_tags = move |ticket: LoadTicket| {
        spawn_local(async move {
            let result = match browser::load_settings().await {
                Ok(settings) => {
                    BlinkoClient::new(settings, FetchTransport)
                        .fetch_tags()
                        .await
                }
                Err(err) => {
                    warn!(error = %err, "failed to read settings");
                    Err(FetchError::NotConfigured)
                }
            };
            let applied = panel
                .try_update(|panel| panel.finish_load(ticket, result))
                .unwrap_or(false);
            if applied {
                panel.with_untracked(|panel| {
                    if let Some(tree) = panel.tree() {
                        trace!(outline = %tree.render(&mut OutlineRenderer), "tag tree loaded");
                    }
                });
            }
        });
    };

    let toggle_panel = move || {
        if let Some(ticket) = panel.try_update(TagPanel::toggle).flatten() {
            load_tags(ticket);
        }
    };

    let retry_load = move || {
        if let Some(ticket) = panel.try_update(TagPanel::retry).flatten() {
            load_tags(ticket);
        }
    };

    let close_panel = move |reason: CloseReason| {
        if panel.with_untracked(TagPanel::is_open) {
            panel.update(|panel| panel.close(reason));
        }
    };

    let on_toggle = Callback::new(move |key: NodeKey| {
        panel.update(|panel| {
            if let Some(tree) = panel.tree_mut() {
                tree.toggle(key);
            }
        });
    });

    let on_select = Callback::new(move |key: NodeKey| {
        if let Some(path) = panel.try_update(|panel| panel.select(key)).flatten() {
            debug!(%path, "tag selected");
            apply_command(MarkdownCommand::InsertTag(path));
        }
    });

    let insert_page_link = move || {
        show_status(StatusKind::Loading, "Getting page link…".to_string());
        spawn_local(async move {
            let page = match browser::active_page().await {
                Ok(page) => page,
                Err(err) => {
                    warn!(error = %err, "failed to query active tab");
                    None
                }
            };
            match page_link(page.as_ref()) {
                Ok(link) => {
                    apply_command(MarkdownCommand::InsertText(link));
                    show_status(StatusKind::Success, "Link inserted".to_string());
                }
                Err(err) => {
                    show_status(StatusKind::Error, format!("Could not get page link: {err}"));
                }
            }
        });
    };

    let clear_note = move || {
        set_note.set(String::new());
        if let Some(field) = textarea.get_untracked() {
            field.set_value("");
        }
        spawn_local(async move {
            if let Err(err) = browser::clear_draft().await {
                warn!(error = %err, "failed to clear quick note draft");
            }
        });
    };

    let _ = window_event_listener(ev::keydown, move |ev| {
        let chord = KeyChord {
            key: ev.key(),
            ctrl: ev.ctrl_key(),
            meta: ev.meta_key(),
            shift: ev.shift_key(),
        };
        let Some(action) = resolve_shortcut(&chord, panel.with_untracked(TagPanel::is_open))
        else {
            return;
        };
        ev.prevent_default();
        match action {
            ShortcutAction::InsertPageLink => insert_page_link(),
            ShortcutAction::ToggleTagPanel => toggle_panel(),
            ShortcutAction::CloseTagPanel => close_panel(CloseReason::Escape),
        }
    });

    let _ = window_event_listener(ev::click, move |ev| {
        if !panel.with_untracked(TagPanel::is_open) {
            return;
        }
        let Some(target) = ev.target().and_then(|target| target.dyn_into::<Node>().ok()) else {
            return;
        };
        let inside = |element: Option<leptos::web_sys::HtmlElement>| {
            element.is_some_and(|element| element.contains(Some(&target)))
        };
        if inside(panel_ref.get_untracked().map(Into::into))
            || inside(tag_button.get_untracked().map(Into::into))
        {
            return;
        }
        close_panel(CloseReason::OutsideClick);
    });

    let panel_content = move || {
        panel.with(|panel| match panel.state() {
            PanelState::Closed => ().into_any(),
            PanelState::Loading => view! {
                <div class="tag-loading" style="padding: 0.75rem; color: var(--text-muted); text-align: center;">
                    "Loading tags…"
                </div>
            }
            .into_any(),
            PanelState::Ready(tree) => {
                let mut renderer = TagTreeView {
                    on_toggle,
                    on_select,
                };
                view! { <div class="tag-tree">{tree.render(&mut renderer)}</div> }.into_any()
            }
            PanelState::Failed(failure) => {
                let category = failure.category();
                let detail = failure.detail.clone();
                view! {
                    <div class="tag-error" style="padding: 0.75rem; display: flex; flex-direction: column; gap: 0.5rem;">
                        <div class="error-message" style="font-weight: 600;">"Failed to load tags"</div>
                        <div class="error-detail">{category.message()}</div>
                        <div class="error-detail-raw" style="font-size: 0.8em; color: var(--text-muted); word-break: break-all;">{detail}</div>
                        <div class="error-actions">
                            <button
                                class="retry-btn"
                                on:click=move |ev| {
                                    ev.stop_propagation();
                                    retry_load();
                                }
                            >
                                "Retry"
                            </button>
                        </div>
                    </div>
                }
                .into_any()
            }
        })
    };

    let status_view = move || {
        status.get().map(|status| {
            let color = match status.kind {
                StatusKind::Loading => "var(--text-muted)",
                StatusKind::Success => "#16a34a",
                StatusKind::Error => "#dc2626",
            };
            view! {
                <div class="status" style=format!("padding: 0.4rem 0.75rem; font-size: 0.85rem; color: {color};")>
                    {status.message}
                </div>
            }
        })
    };

    let toolbar_button = "background: transparent; border: none; padding: 0.25rem 0.4rem; cursor: pointer; color: var(--text-secondary); border-radius: var(--radius-md);";

    view! {
        <main class="popup-layout" style="display: flex; flex-direction: column; width: 380px; gap: 0.5rem; padding: 0.75rem; background: var(--bg-primary); color: var(--text-primary);">
            <textarea
                id="quickNoteInput"
                node_ref=textarea
                style="width: 100%; min-height: 140px; box-sizing: border-box; padding: 0.5rem; font-family: var(--font-editor); font-size: 0.9rem; line-height: 1.5; border: 1px solid var(--border-color); border-radius: var(--radius-md); background: var(--bg-secondary); color: var(--text-primary); resize: vertical;"
                prop:value=move || note.get()
                on:input=move |ev| {
                    let text = event_target_value(&ev);
                    set_note.set(text.clone());
                    persist_draft(text);
                }
                placeholder="Write a quick note…"
                spellcheck="false"
            ></textarea>
            <div class="enhanced-toolbar" style="position: relative; display: flex; align-items: center; gap: 0.15rem; flex-wrap: wrap;">
                {ToolbarAction::ALL
                    .into_iter()
                    .map(|action| {
                        view! {
                            <button
                                class="toolbar-btn"
                                style=toolbar_button
                                title=action.title()
                                on:click=move |_| apply_command(action.command())
                            >
                                {action.glyph()}
                            </button>
                        }
                    })
                    .collect_view()}
                <button
                    class="toolbar-btn"
                    style=toolbar_button
                    title="Insert current page link (Ctrl+L)"
                    on:click=move |_| insert_page_link()
                >
                    "🔗"
                </button>
                <button
                    class="toolbar-btn"
                    node_ref=tag_button
                    style=toolbar_button
                    title="Insert tag (Ctrl+Shift+T)"
                    on:click=move |_| toggle_panel()
                >
                    "#"
                </button>
                <div
                    class="tag-panel"
                    node_ref=panel_ref
                    style=move || format!(
                        "display: {}; position: absolute; top: 100%; right: 0; z-index: 10; width: 260px; max-height: 280px; overflow-y: auto; background: var(--bg-primary); border: 1px solid var(--border-color); border-radius: var(--radius-md); box-shadow: 0 6px 18px rgba(0, 0, 0, 0.15);",
                        if panel.with(TagPanel::is_open) { "block" } else { "none" },
                    )
                >
                    <div class="tag-panel-header" style="display: flex; align-items: center; justify-content: space-between; padding: 0.4rem 0.6rem; border-bottom: 1px solid var(--border-color); font-weight: 600; font-size: 0.85rem;">
                        <span class="tag-panel-title">"Tags"</span>
                        <div class="tag-panel-controls" style="display: flex; gap: 0.25rem;">
                            <button
                                class="control-btn"
                                style=toolbar_button
                                title="Expand all"
                                on:click=move |ev| {
                                    ev.stop_propagation();
                                    panel.update(|panel| {
                                        if let Some(tree) = panel.tree_mut() {
                                            tree.expand_all();
                                        }
                                    });
                                }
                            >
                                "⊞"
                            </button>
                            <button
                                class="control-btn"
                                style=toolbar_button
                                title="Collapse all"
                                on:click=move |ev| {
                                    ev.stop_propagation();
                                    panel.update(|panel| {
                                        if let Some(tree) = panel.tree_mut() {
                                            tree.collapse_all();
                                        }
                                    });
                                }
                            >
                                "⊟"
                            </button>
                            <button
                                class="control-btn close-btn"
                                style=toolbar_button
                                title="Close"
                                on:click=move |ev| {
                                    ev.stop_propagation();
                                    close_panel(CloseReason::Dismissed);
                                }
                            >
                                "×"
                            </button>
                        </div>
                    </div>
                    <div class="tag-panel-content">{panel_content}</div>
                </div>
            </div>
            <div style="display: flex; justify-content: flex-end;">
                <button
                    id="clearQuickNote"
                    style=toolbar_button
                    title="Clear note"
                    on:click=move |_| clear_note()
                >
                    "Clear"
                </button>
            </div>
            {status_view}
        </main>
    }
}
