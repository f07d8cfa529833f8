use gloo_timers::callback::Timeout;
use leptos::ev;
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;

use crate::app::{
    DisplayName, IsAdmin, LayerOrderState, MapError, MapToken, Places, PublicIp, RosterTiles,
    SelfLocation, ThemeChoice,
};
use crate::config::{
    self, FOCUS_ZOOM, SHEET_EXPANDED_HEIGHT, SHEET_PEEK_HEIGHT, SHEET_TRANSITION_MS,
    TOAST_DURATION_MS,
};
use crate::layers::{DragSession, LayerKind};
use crate::location::resolve_by_gps;
use crate::map_surface::MapController;
use crate::presence::{DeleteError, PresenceClient};
use crate::roster::{DisplayTile, count_label};
use crate::theme::ThemeMode;

const PANEL_STYLE: &str = "background: var(--panel-bg); color: var(--panel-fg); border: 1px solid var(--panel-border); border-radius: 12px; box-shadow: 0 8px 28px rgba(0,0,0,0.28); font-family: 'Inter', system-ui, sans-serif;";

fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

/// Sheet body height: expanded, peeking under the pointer, or closed.
pub(crate) fn sheet_max_height(expanded: bool, hovering: bool) -> &'static str {
    if expanded {
        SHEET_EXPANDED_HEIGHT
    } else if hovering {
        SHEET_PEEK_HEIGHT
    } else {
        "0px"
    }
}

/// Whether the profile card offers removal without being refused up front.
/// The server still has the final word.
pub(crate) fn can_remove(
    is_admin: bool,
    tile: &DisplayTile,
    own_ip: Option<&str>,
    own_name: Option<&str>,
) -> bool {
    is_admin || own_ip.is_some_and(|ip| ip == tile.ip) || own_name.is_some_and(|name| name == tile.name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tab {
    Roster,
    Places,
    MapData,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Roster, Tab::Places, Tab::MapData];

    fn label(self) -> &'static str {
        match self {
            Self::Roster => "Visitors",
            Self::Places => "Places",
            Self::MapData => "Map data",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            Self::Roster => "group",
            Self::Places => "place",
            Self::MapData => "layers",
        }
    }
}

/// Dismissible message for refused actions. A newer message restarts the timer.
#[derive(Clone, Copy)]
pub(crate) struct Toast {
    message: RwSignal<Option<String>>,
    generation: StoredValue<u64>,
}

impl Toast {
    pub(crate) fn new() -> Self {
        Self {
            message: RwSignal::new(None),
            generation: StoredValue::new(0),
        }
    }

    pub(crate) fn show(&self, message: impl Into<String>) {
        let generation = self
            .generation
            .try_update_value(|g| {
                *g += 1;
                *g
            })
            .unwrap_or_default();
        self.message.set(Some(message.into()));

        let toast = *self;
        Timeout::new(TOAST_DURATION_MS, move || {
            if toast.generation.try_get_value() == Some(generation) {
                toast.dismiss();
            }
        })
        .forget();
    }

    pub(crate) fn dismiss(&self) {
        self.message.set(None);
    }
}

#[component]
pub(crate) fn ToastView() -> impl IntoView {
    let toast: Toast = expect_context();

    view! {
        <Show when=move || toast.message.with(Option::is_some)>
            <div
                role="alert"
                class="osiris-toast"
                style="position: absolute; top: 16px; left: 50%; transform: translateX(-50%); z-index: 40; padding: 10px 16px; border-radius: 8px; background: var(--toast-bg); color: var(--toast-fg); cursor: pointer; font-size: 0.88rem;"
                on:click=move |_| toast.dismiss()
            >
                {move || toast.message.get().unwrap_or_default()}
            </div>
        </Show>
    }
}

#[component]
pub(crate) fn BackendNotice() -> impl IntoView {
    let presence: PresenceClient = expect_context();
    let dismissed = RwSignal::new(false);

    view! {
        <Show when=move || presence.misconfigured.get() && !dismissed.get()>
            <div
                role="status"
                style=format!("position: absolute; top: 16px; right: 16px; z-index: 30; padding: 12px 14px; max-width: 280px; font-size: 0.82rem; {PANEL_STYLE}")
            >
                <div>"The visitor roster needs the backend enabled on this host."</div>
                <button
                    type="button"
                    style="margin-top: 8px; background: none; border: none; color: var(--accent); cursor: pointer; padding: 0;"
                    on:click=move |_| dismissed.set(true)
                >
                    "Dismiss"
                </button>
            </div>
        </Show>
    }
}

#[component]
pub(crate) fn TokenOverlay() -> impl IntoView {
    let MapError(error) = expect_context();
    let MapToken(token) = expect_context();
    let draft = RwSignal::new(String::new());

    let on_submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let value = draft.get_untracked().trim().to_string();
        if value.is_empty() {
            return;
        }
        config::save_mapbox_token(&value);
        token.set(Some(value));
    };

    view! {
        <Show when=move || error.with(Option::is_some)>
            <div
                style="position: absolute; inset: 0; z-index: 50; display: flex; align-items: center; justify-content: center; background: rgba(0,0,0,0.45);"
            >
                <form
                    role="dialog"
                    aria-modal="true"
                    aria-labelledby="osiris-token-title"
                    style=format!("width: min(420px, 90vw); padding: 20px; {PANEL_STYLE}")
                    on:submit=on_submit
                >
                    <h2 id="osiris-token-title" style="margin: 0 0 8px; font-size: 1.05rem;">"Map access token"</h2>
                    <p style="margin: 0 0 12px; font-size: 0.82rem; opacity: 0.8;">
                        {move || error.get().unwrap_or_default()}
                    </p>
                    <input
                        type="password"
                        autocomplete="off"
                        placeholder="pk.…"
                        style="width: 100%; padding: 8px 10px; border-radius: 6px; border: 1px solid var(--panel-border); background: var(--input-bg); color: inherit;"
                        prop:value=move || draft.get()
                        on:input=move |ev| draft.set(event_target_value(&ev))
                    />
                    <button type="submit" class="osiris-primary" style="margin-top: 12px;">"Load map"</button>
                </form>
            </div>
        </Show>
    }
}

#[component]
pub(crate) fn MapControls() -> impl IntoView {
    let controller: MapController = expect_context();
    let SelfLocation(location) = expect_context();
    let engaged = controller.rotation_engaged;

    let on_locate = move |_| {
        spawn_local(async move {
            match resolve_by_gps().await {
                Ok(coordinate) => {
                    let target = coordinate.lng_lat();
                    location.set(Some(coordinate));
                    controller.fly_to(target, FOCUS_ZOOM);
                }
                Err(e) => alert(&format!("Could not get your location: {e}")),
            }
        });
    };

    let button_style = "width: 40px; height: 40px; display: flex; align-items: center; justify-content: center; border: none; background: transparent; color: inherit; cursor: pointer;";

    view! {
        <div
            class="osiris-map-controls"
            style=format!("position: absolute; right: 16px; top: 50%; transform: translateY(-50%); z-index: 15; display: flex; flex-direction: column; {PANEL_STYLE}")
        >
            <button
                type="button"
                title="Rotate globe"
                aria-pressed=move || if engaged.get() { "true" } else { "false" }
                class:active=move || engaged.get()
                style=button_style
                on:click=move |_| controller.toggle_rotation()
            >
                <span class="material-symbols-outlined">"360"</span>
            </button>
            <button type="button" title="Zoom in" style=button_style on:click=move |_| controller.zoom_in()>
                <span class="material-symbols-outlined">"add"</span>
            </button>
            <button type="button" title="Zoom out" style=button_style on:click=move |_| controller.zoom_out()>
                <span class="material-symbols-outlined">"remove"</span>
            </button>
            <button type="button" title="Use my precise location" style=button_style on:click=on_locate>
                <span class="material-symbols-outlined">"my_location"</span>
            </button>
        </div>
    }
}

#[component]
pub(crate) fn BottomSheet() -> impl IntoView {
    let controller: MapController = expect_context();
    let RosterTiles(tiles) = expect_context();
    let expanded = controller.sheet_expanded;
    let hovering = RwSignal::new(false);
    let active = RwSignal::new(Tab::Roster);

    let select_tab = move |tab: Tab| {
        active.set(tab);
        if !expanded.get_untracked() {
            controller.set_sheet_expanded(true);
        }
    };

    view! {
        <section
            class="osiris-sheet"
            style="position: absolute; left: 0; right: 0; bottom: 0; z-index: 20; background: var(--panel-bg); color: var(--panel-fg); border-top: 1px solid var(--panel-border); border-radius: 14px 14px 0 0; box-shadow: 0 -6px 24px rgba(0,0,0,0.22);"
            on:mouseleave=move |_| hovering.set(false)
        >
            <button
                type="button"
                class="osiris-sheet-handle"
                aria-controls="osiris-sheet-body"
                aria-expanded=move || if expanded.get() { "true" } else { "false" }
                style="width: 100%; display: flex; align-items: center; justify-content: space-between; gap: 12px; padding: 10px 18px; background: none; border: none; color: inherit; cursor: pointer; font-size: 0.85rem;"
                on:click=move |_| controller.set_sheet_expanded(!expanded.get_untracked())
                on:mouseenter=move |_| hovering.set(true)
            >
                <span>{move || count_label(tiles.with(Vec::len))}</span>
                <span class="material-symbols-outlined">
                    {move || if expanded.get() { "expand_more" } else { "expand_less" }}
                </span>
            </button>
            <nav role="tablist" style="display: flex; gap: 4px; padding: 0 12px;">
                {Tab::ALL
                    .into_iter()
                    .map(|tab| {
                        view! {
                            <button
                                type="button"
                                role="tab"
                                aria-selected=move || if active.get() == tab { "true" } else { "false" }
                                class:active=move || active.get() == tab
                                style="flex: 1; display: flex; align-items: center; justify-content: center; gap: 6px; padding: 8px; background: none; border: none; border-bottom: 2px solid transparent; color: inherit; cursor: pointer; font-size: 0.8rem;"
                                style:border-bottom-color=move || if active.get() == tab { "var(--accent)" } else { "transparent" }
                                on:click=move |_| select_tab(tab)
                            >
                                <span class="material-symbols-outlined">{tab.icon()}</span>
                                {tab.label()}
                            </button>
                        }
                    })
                    .collect_view()}
            </nav>
            <div
                id="osiris-sheet-body"
                role="tabpanel"
                style=format!("overflow-y: auto; transition: max-height {SHEET_TRANSITION_MS}ms ease;")
                style:max-height=move || sheet_max_height(expanded.get(), hovering.get())
            >
                {move || match active.get() {
                    Tab::Roster => view! { <RosterTab /> }.into_any(),
                    Tab::Places => view! { <PlacesTab /> }.into_any(),
                    Tab::MapData => view! { <MapDataTab /> }.into_any(),
                }}
            </div>
        </section>
    }
}

#[component]
fn DisplayNameForm() -> impl IntoView {
    let DisplayName(name) = expect_context();
    let draft = RwSignal::new(name.get_untracked().unwrap_or_default());

    let on_submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let value = draft.get_untracked().trim().to_string();
        if value.is_empty() {
            return;
        }
        config::save_display_name(&value);
        name.set(Some(value));
    };

    view! {
        <form style="display: flex; gap: 8px; padding: 12px 18px 4px;" on:submit=on_submit>
            <input
                type="text"
                maxlength="64"
                placeholder="Your display name"
                aria-label="Display name"
                style="flex: 1; padding: 7px 10px; border-radius: 6px; border: 1px solid var(--panel-border); background: var(--input-bg); color: inherit;"
                prop:value=move || draft.get()
                on:input=move |ev| draft.set(event_target_value(&ev))
            />
            <button type="submit" class="osiris-primary">
                {move || if name.with(Option::is_some) { "Rename" } else { "Join map" }}
            </button>
        </form>
    }
}

#[component]
fn RosterTab() -> impl IntoView {
    let RosterTiles(tiles) = expect_context();
    let IsAdmin(is_admin) = expect_context();
    let presence: PresenceClient = expect_context();
    let toast: Toast = expect_context();

    let on_clear = move |_| {
        if !is_admin.get_untracked() {
            toast.show(DeleteError::Unauthorized.to_string());
            return;
        }
        spawn_local(async move {
            match presence.clear().await {
                Ok(()) => tiles.set(Vec::new()),
                Err(DeleteError::Unauthorized) => toast.show(DeleteError::Unauthorized.to_string()),
                Err(e) => warn(&format!("roster clear failed: {e}")),
            }
        });
    };

    view! {
        <div>
            <DisplayNameForm />
            <div style="display: flex; align-items: center; justify-content: space-between; padding: 8px 18px; font-size: 0.75rem; text-transform: uppercase; letter-spacing: 0.08em; opacity: 0.7;">
                <span>{move || count_label(tiles.with(Vec::len))}</span>
                <button
                    type="button"
                    style="background: none; border: none; color: inherit; cursor: pointer; font-size: 0.72rem;"
                    on:click=on_clear
                >
                    "Clear"
                </button>
            </div>
            <Show
                when=move || tiles.with(|tiles| !tiles.is_empty())
                fallback=|| view! { <div style="padding: 12px 18px; font-size: 0.85rem; opacity: 0.6;">"No visitors yet."</div> }
            >
                <ul style="list-style: none; margin: 0; padding: 0 8px 12px;">
                    <For
                        each=move || tiles.get()
                        key=|tile| (tile.id, tile.last_seen)
                        let:tile
                    >
                        <RosterTileView tile=tile />
                    </For>
                </ul>
            </Show>
        </div>
    }
}

#[component]
fn RosterTileView(tile: DisplayTile) -> impl IntoView {
    let controller: MapController = expect_context();
    let class = if tile.is_new {
        "osiris-roster-tile osiris-roster-tile-new"
    } else {
        "osiris-roster-tile"
    };
    let place = tile
        .place_label()
        .unwrap_or_else(|| "Unknown location".to_string());
    let status = tile.status;
    let name = tile.name.clone();
    let initials = tile.initials.clone();
    let last_seen = tile.last_seen_label.clone();
    let avatar = tile.avatar;

    view! {
        <li
            class=class
            style="display: flex; align-items: center; gap: 10px; padding: 8px 10px; border-radius: 8px; cursor: pointer;"
            on:click=move |_| controller.focus_visitor(tile.clone())
        >
            <img src=avatar alt=initials width="32" height="32" style="border-radius: 50%; flex-shrink: 0;" />
            <div style="flex: 1; min-width: 0;">
                <div style="display: flex; align-items: center; gap: 6px; font-size: 0.9rem;">
                    <span style="overflow: hidden; text-overflow: ellipsis; white-space: nowrap;">{name}</span>
                    <span class=format!("osiris-status-dot {}", status.css_class()) title=status.label() />
                </div>
                <div style="font-size: 0.75rem; opacity: 0.65;">{place} " • " {last_seen}</div>
            </div>
        </li>
    }
}

#[component]
fn PlacesTab() -> impl IntoView {
    let Places(points) = expect_context();
    let controller: MapController = expect_context();

    view! {
        <Show
            when=move || points.with(|points| !points.is_empty())
            fallback=|| view! { <div style="padding: 12px 18px; font-size: 0.85rem; opacity: 0.6;">"No places to show."</div> }
        >
            <ul style="list-style: none; margin: 0; padding: 8px 8px 12px;">
                <For each=move || points.get() key=|point| point.id let:point>
                    {
                        let target = point.coordinate().lng_lat();
                        view! {
                            <li
                                class="osiris-poi-tile"
                                style="display: flex; align-items: center; gap: 10px; padding: 8px 10px; border-radius: 8px; cursor: pointer;"
                                on:click=move |_| controller.fly_to(target, FOCUS_ZOOM)
                            >
                                <span class="material-symbols-outlined">{point.icon.clone()}</span>
                                <div>
                                    <div style="font-size: 0.9rem;">{point.brand.clone()}</div>
                                    <div style="font-size: 0.75rem; opacity: 0.65;">{point.location.clone()}</div>
                                </div>
                            </li>
                        }
                    }
                </For>
            </ul>
        </Show>
    }
}

/// Centers of the non-dragged tiles along the row, in display order.
fn sibling_midpoints(container: &web_sys::Element, dragged: LayerKind) -> Vec<f64> {
    let Ok(nodes) = container.query_selector_all("[data-layer-tile]") else {
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|index| nodes.item(index))
        .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
        .filter(|el| el.get_attribute("data-layer-tile").as_deref() != Some(dragged.key()))
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            rect.left() + rect.width() / 2.0
        })
        .collect()
}

fn contains_point(el: &web_sys::Element, x: f64, y: f64) -> bool {
    let rect = el.get_bounding_client_rect();
    rect_contains((rect.left(), rect.top(), rect.right(), rect.bottom()), x, y)
}

/// Edges are `(left, top, right, bottom)`; the border counts as inside.
fn rect_contains((left, top, right, bottom): (f64, f64, f64, f64), x: f64, y: f64) -> bool {
    x >= left && x <= right && y >= top && y <= bottom
}

#[component]
fn MapDataTab() -> impl IntoView {
    let LayerOrderState(order) = expect_context();
    let container = NodeRef::<leptos::html::Div>::new();
    let drag = StoredValue::new(None::<DragSession>);
    let dragging = RwSignal::new(None::<LayerKind>);

    let on_move = move |ev: web_sys::PointerEvent| {
        let Some(dragged) = dragging.get_untracked() else {
            return;
        };
        let Some(el) = container.get_untracked() else {
            return;
        };
        let midpoints = sibling_midpoints(&el, dragged);
        let pointer = f64::from(ev.client_x());
        let preview = drag
            .try_update_value(|session| session.as_mut().map(|s| s.move_to(&midpoints, pointer)))
            .flatten();
        if let Some(preview) = preview {
            if order.with_untracked(|current| *current != preview) {
                order.set(preview);
            }
        }
    };

    let on_release = move |ev: web_sys::PointerEvent| {
        let Some(session) = drag.try_update_value(Option::take).flatten() else {
            return;
        };
        dragging.set(None);
        let inside = container
            .get_untracked()
            .is_some_and(|el| contains_point(
                    &el,
                    f64::from(ev.client_x()),
                    f64::from(ev.client_y()),
                ));
        order.set(session.finish(inside));
    };

    let on_cancel = move |_: web_sys::PointerEvent| {
        if let Some(session) = drag.try_update_value(Option::take).flatten() {
            dragging.set(None);
            order.set(session.finish(false));
        }
    };

    let listeners = StoredValue::<_, LocalStorage>::new_local(vec![
        window_event_listener(ev::pointermove, on_move),
        window_event_listener(ev::pointerup, on_release),
        window_event_listener(ev::pointercancel, on_cancel),
    ]);
    on_cleanup(move || {
        let _ = listeners.try_update_value(|handles| {
            for handle in handles.drain(..) {
                handle.remove();
            }
        });
    });

    view! {
        <div style="padding: 12px 18px 16px;">
            <div style="font-size: 0.75rem; text-transform: uppercase; letter-spacing: 0.08em; opacity: 0.7; margin-bottom: 8px;">
                "Layers"
            </div>
            <div
                node_ref=container
                role="list"
                style="display: flex; flex-wrap: nowrap; gap: 8px; overflow-x: auto; touch-action: none;"
            >
                <For each=move || order.get().kinds().to_vec() key=|kind| *kind let:kind>
                    <LayerTile kind=kind dragging=dragging drag=drag />
                </For>
            </div>
            <div style="font-size: 0.75rem; text-transform: uppercase; letter-spacing: 0.08em; opacity: 0.7; margin: 16px 0 8px;">
                "Theme"
            </div>
            <ThemeSwitcher />
        </div>
    }
}

#[component]
fn LayerTile(
    kind: LayerKind,
    dragging: RwSignal<Option<LayerKind>>,
    drag: StoredValue<Option<DragSession>>,
) -> impl IntoView {
    let controller: MapController = expect_context();
    let LayerOrderState(order) = expect_context();
    let visible = move || controller.layers.with(|layers| layers.get(kind));

    let on_grab = move |ev: web_sys::PointerEvent| {
        ev.prevent_default();
        ev.stop_propagation();
        drag.set_value(Some(DragSession::begin(&order.get_untracked(), kind)));
        dragging.set(Some(kind));
    };

    view! {
        <div
            role="listitem"
            data-layer-tile=kind.key()
            aria-pressed=move || if visible() { "true" } else { "false" }
            class="osiris-layer-tile"
            class:active=visible
            class:dragging=move || dragging.get() == Some(kind)
            style="flex: 0 0 auto; min-width: 96px; display: flex; flex-direction: column; align-items: center; gap: 4px; padding: 10px 8px 8px; border-radius: 10px; border: 1px solid var(--panel-border); cursor: pointer; user-select: none; font-size: 0.78rem;"
            style:opacity=move || if visible() { "1" } else { "0.55" }
            on:click=move |_| {
                let next = !controller.layers.with_untracked(|layers| layers.get(kind));
                controller.set_layer_visible(kind, next);
            }
        >
            <span
                class="material-symbols-outlined"
                title="Drag to reorder"
                style="align-self: flex-end; font-size: 16px; cursor: grab; opacity: 0.6;"
                on:pointerdown=on_grab
                on:click=|ev| ev.stop_propagation()
            >
                "drag_indicator"
            </span>
            <span class="material-symbols-outlined">{kind.icon()}</span>
            <span>{kind.label()}</span>
        </div>
    }
}

#[component]
fn ThemeSwitcher() -> impl IntoView {
    let ThemeChoice(mode) = expect_context();

    view! {
        <div role="radiogroup" aria-label="Theme" style="display: flex; gap: 6px;">
            {ThemeMode::ALL
                .into_iter()
                .map(|choice| {
                    view! {
                        <button
                            type="button"
                            role="radio"
                            aria-checked=move || if mode.get() == choice { "true" } else { "false" }
                            class:active=move || mode.get() == choice
                            style="flex: 1; padding: 6px 8px; border-radius: 6px; border: 1px solid var(--panel-border); background: transparent; color: inherit; cursor: pointer; font-size: 0.8rem;"
                            on:click=move |_| mode.set(choice)
                        >
                            {choice.label()}
                        </button>
                    }
                })
                .collect_view()}
        </div>
    }
}

#[component]
pub(crate) fn ProfilePanel() -> impl IntoView {
    let controller: MapController = expect_context();
    let selected = controller.selected_visitor;
    let position = RwSignal::new((24.0_f64, 96.0_f64));
    let grab = StoredValue::new(None::<(f64, f64)>);

    let listeners = StoredValue::<_, LocalStorage>::new_local(vec![
        window_event_listener(ev::pointermove, move |ev: web_sys::PointerEvent| {
            if let Some((dx, dy)) = grab.get_value() {
                position.set((f64::from(ev.client_x()) - dx, f64::from(ev.client_y()) - dy));
            }
        }),
        window_event_listener(ev::pointerup, move |_| grab.set_value(None)),
    ]);
    on_cleanup(move || {
        let _ = listeners.try_update_value(|handles| {
            for handle in handles.drain(..) {
                handle.remove();
            }
        });
    });

    view! {
        {move || {
            selected
                .get()
                .map(|tile| view! { <ProfileCard tile=tile position=position grab=grab /> })
        }}
    }
}

#[component]
fn ProfileCard(
    tile: DisplayTile,
    position: RwSignal<(f64, f64)>,
    grab: StoredValue<Option<(f64, f64)>>,
) -> impl IntoView {
    let controller: MapController = expect_context();
    let presence: PresenceClient = expect_context();
    let toast: Toast = expect_context();
    let RosterTiles(tiles) = expect_context();
    let IsAdmin(is_admin) = expect_context();
    let PublicIp(public_ip) = expect_context();
    let DisplayName(display_name) = expect_context();

    let on_grab = move |ev: web_sys::PointerEvent| {
        let (left, top) = position.get_untracked();
        grab.set_value(Some((
            f64::from(ev.client_x()) - left,
            f64::from(ev.client_y()) - top,
        )));
    };

    let id = tile.id;
    let removable = tile.clone();
    let on_remove = move |_| {
        let allowed = can_remove(
            is_admin.get_untracked(),
            &removable,
            public_ip.get_untracked().as_deref(),
            display_name.get_untracked().as_deref(),
        );
        if !allowed {
            toast.show(DeleteError::Unauthorized.to_string());
            return;
        }
        spawn_local(async move {
            match presence.delete(id).await {
                Ok(()) | Err(DeleteError::NotFound) => {
                    tiles.update(|tiles| tiles.retain(|tile| tile.id != id));
                    controller.selected_visitor.set(None);
                }
                Err(DeleteError::Unauthorized) => {
                    toast.show(DeleteError::Unauthorized.to_string())
                }
                Err(e) => warn(&format!("profile removal failed: {e}")),
            }
        });
    };

    let place = tile
        .place_label()
        .unwrap_or_else(|| "Unknown location".to_string());
    let status = tile.status;

    view! {
        <aside
            class="osiris-profile"
            aria-label="Visitor profile"
            style=format!("position: absolute; z-index: 25; width: 260px; {PANEL_STYLE}")
            style:left=move || format!("{}px", position.get().0)
            style:top=move || format!("{}px", position.get().1)
        >
            <header
                style="display: flex; align-items: center; gap: 10px; padding: 12px 14px; cursor: move; touch-action: none;"
                on:pointerdown=on_grab
            >
                <img src=tile.avatar alt=tile.initials.clone() width="40" height="40" style="border-radius: 50%;" />
                <div style="flex: 1; min-width: 0;">
                    <div style="font-weight: 600;">{tile.name.clone()}</div>
                    <div style="display: flex; align-items: center; gap: 6px; font-size: 0.78rem;">
                        <span class=format!("osiris-status-dot {}", status.css_class()) />
                        {status.label()}
                    </div>
                </div>
                <button
                    type="button"
                    aria-label="Close"
                    style="background: none; border: none; color: inherit; cursor: pointer;"
                    on:pointerdown=|ev| ev.stop_propagation()
                    on:click=move |_| controller.selected_visitor.set(None)
                >
                    <span class="material-symbols-outlined">"close"</span>
                </button>
            </header>
            <dl style="margin: 0; padding: 0 14px 8px; font-size: 0.82rem; display: grid; grid-template-columns: auto 1fr; gap: 4px 12px;">
                <dt style="opacity: 0.6;">"City"</dt>
                <dd style="margin: 0;">{place}</dd>
                <dt style="opacity: 0.6;">"Last seen"</dt>
                <dd style="margin: 0;">{tile.last_seen_label.clone()}</dd>
            </dl>
            <div style="padding: 8px 14px 14px;">
                <button type="button" class="osiris-danger" on:click=on_remove>"Remove from map"</button>
            </div>
        </aside>
    }
}

#[cfg(test)]
mod tests {
    use osiris_shared::PresenceStatus;

    use super::*;

    fn tile(name: &str, ip: &str) -> DisplayTile {
        DisplayTile {
            id: 1,
            name: name.to_string(),
            ip: ip.to_string(),
            avatar: "",
            initials: String::new(),
            status: PresenceStatus::Connected,
            coordinate: None,
            last_seen: 0,
            last_seen_label: "just now".to_string(),
            is_new: false,
        }
    }

    #[test]
    fn sheet_heights_cover_expanded_peek_and_closed() {
        assert_eq!(sheet_max_height(true, false), "380px");
        assert_eq!(sheet_max_height(true, true), "380px");
        assert_eq!(sheet_max_height(false, true), "80px");
        assert_eq!(sheet_max_height(false, false), "0px");
    }

    #[test]
    fn only_owner_or_admin_may_remove() {
        let record = tile("Ada", "203.0.113.5");
        assert!(can_remove(true, &record, None, None));
        assert!(can_remove(false, &record, Some("203.0.113.5"), None));
        assert!(can_remove(false, &record, None, Some("Ada")));
        assert!(!can_remove(false, &record, Some("198.51.100.9"), Some("Bo")));
        assert!(!can_remove(false, &record, None, None));
    }

    #[test]
    fn release_point_inside_fractional_rect_keeps_the_drop() {
        let rect = (10.5, 20.25, 110.5, 60.75);
        assert!(rect_contains(rect, 10.5, 20.25));
        assert!(rect_contains(rect, 60.4, 40.0));
        assert!(!rect_contains(rect, 110.6, 40.0));
        assert!(!rect_contains(rect, 60.0, 20.0));
    }
}
