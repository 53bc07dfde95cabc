// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resumable widget painting.
//!
//! Widgets paint through a [`WidgetBehavior`], one [`draw_step`] at a time.
//! Each step issues at most a handful of driver calls and then reports how to
//! proceed:
//!
//! - [`DrawStep::Continue`] — more steps remain; call again.
//! - [`DrawStep::Yield`] — more steps remain, but the behavior wants the
//!   engine to return to the caller first (long fills, async pushes).
//! - [`DrawStep::Done`] — the widget is fully painted for this sub-frame.
//!
//! The position inside a multi-step paint lives in the widget's
//! [`draw_state`](crate::widget::Widget::draw_state) cursor, not in the
//! behavior, so a preempted frame can resume exactly where it stopped even
//! though behaviors are stateless between calls. A widget stays `DIRTY` until
//! its behavior reports `Done`; the paint loop then resets the cursor.
//!
//! [`draw_step`]: WidgetBehavior::draw_step

use alloc::vec;

use crate::hal::{Color, DisplayDriver};
use crate::rect::Rect;
use crate::widget::{Background, Border, PixelCache, Widget};

/// Outcome of one paint step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawStep {
    /// More steps remain; the engine may call again immediately.
    Continue,
    /// More steps remain, but control should return to the caller first.
    Yield,
    /// The widget is fully painted for this sub-frame.
    Done,
}

/// Cursor into a behavior's paint sequence.
///
/// The meaning of the value is private to each behavior; the engine only ever
/// resets it to [`START`](Self::START) after a completed paint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawState(pub u8);

impl DrawState {
    /// The cursor every paint sequence begins at.
    pub const START: Self = Self(0);
}

/// How aggressively the paint loop returns control to the caller.
///
/// Preemption always happens *between* driver calls; a started primitive is
/// never abandoned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreemptLevel {
    /// Run every pending widget of the sub-frame before returning.
    #[default]
    None,
    /// Return after each completed widget.
    Level1,
    /// Return after every single draw step.
    Level2,
}

/// Whether a widget wants further update ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Nothing scheduled; the widget can idle.
    #[default]
    Done,
    /// An animation or timer is running; keep ticking.
    Pending,
}

/// The classic sixteen-slot color scheme widgets paint from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scheme {
    /// Fill color for plain backgrounds.
    pub base: Color,
    /// Raised-edge color.
    pub highlight: Color,
    /// Brightest raised-edge color.
    pub highlight_light: Color,
    /// Sunken-edge color.
    pub shadow: Color,
    /// Darkest sunken-edge and line-border color.
    pub shadow_dark: Color,
    /// Primary drawing color.
    pub foreground: Color,
    /// Drawing color for inactive widgets.
    pub foreground_inactive: Color,
    /// Drawing color for disabled widgets.
    pub foreground_disabled: Color,
    /// Content background.
    pub background: Color,
    /// Content background for inactive widgets.
    pub background_inactive: Color,
    /// Content background for disabled widgets.
    pub background_disabled: Color,
    /// Text color.
    pub text: Color,
    /// Selected-text background.
    pub text_highlight: Color,
    /// Selected-text color.
    pub text_highlight_text: Color,
    /// Text color for inactive widgets.
    pub text_inactive: Color,
    /// Text color for disabled widgets.
    pub text_disabled: Color,
}

impl Scheme {
    /// The neutral gray default every context starts with.
    pub const DEFAULT: Self = Self {
        base: Color::rgb(0xC8, 0xC8, 0xC8),
        highlight: Color::rgb(0xE0, 0xE0, 0xE0),
        highlight_light: Color::WHITE,
        shadow: Color::rgb(0x80, 0x80, 0x80),
        shadow_dark: Color::rgb(0x40, 0x40, 0x40),
        foreground: Color::BLACK,
        foreground_inactive: Color::rgb(0x60, 0x60, 0x60),
        foreground_disabled: Color::rgb(0x80, 0x80, 0x80),
        background: Color::WHITE,
        background_inactive: Color::rgb(0xF0, 0xF0, 0xF0),
        background_disabled: Color::rgb(0xC8, 0xC8, 0xC8),
        text: Color::BLACK,
        text_highlight: Color::rgb(0x00, 0x00, 0x80),
        text_highlight_text: Color::WHITE,
        text_inactive: Color::rgb(0x60, 0x60, 0x60),
        text_disabled: Color::rgb(0x90, 0x90, 0x90),
    };
}

impl Default for Scheme {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Everything a behavior may touch while painting one step.
///
/// `widget` is the property record; `bounds` is the widget's rect already
/// converted to layer space; `clip` is `bounds` intersected with the current
/// sub-frame rectangle and has been programmed into the driver before the
/// step runs. `alpha` is the cumulative blend amount after ancestor blending.
#[derive(Debug)]
pub struct PaintCx<'a> {
    /// Property record of the widget being painted.
    pub widget: &'a mut Widget,
    /// Widget bounds in layer space.
    pub bounds: Rect,
    /// Active clip, in layer space.
    pub clip: Rect,
    /// Cumulative alpha, 255 = opaque.
    pub alpha: u8,
}

/// Per-widget paint and lifecycle hooks.
///
/// Behaviors are owned by the [`WidgetStore`](crate::widget::WidgetStore) and
/// temporarily taken out of their slot for the duration of a hook call, which
/// is what lets a hook receive `&mut Widget` without aliasing the store.
/// Every hook except [`draw_step`](Self::draw_step) has a no-op default.
pub trait WidgetBehavior {
    /// Paints one step of the widget. See the module docs for the contract.
    fn draw_step(&mut self, cx: &mut PaintCx<'_>, driver: &mut dyn DisplayDriver) -> DrawStep;

    /// Called after the widget's position changed.
    fn moved(&mut self, widget: &mut Widget) {
        _ = widget;
    }

    /// Called after the widget's size changed.
    fn resized(&mut self, widget: &mut Widget) {
        _ = widget;
    }

    /// Advances animations by `dt_ms` milliseconds.
    ///
    /// A behavior that changed its appearance raises the widget's dirty
    /// state ([`Widget::set_dirty`]); the update pass turns that into layer
    /// damage. Return [`UpdateStatus::Pending`] to keep receiving ticks.
    fn update(&mut self, widget: &mut Widget, dt_ms: u32) -> UpdateStatus {
        _ = (widget, dt_ms);
        UpdateStatus::Done
    }

    /// Called when the widget receives input focus.
    fn focus_gained(&mut self, widget: &mut Widget) {
        _ = widget;
    }

    /// Called when the widget loses input focus.
    fn focus_lost(&mut self, widget: &mut Widget) {
        _ = widget;
    }

    /// Whether the widget accepts edit mode.
    fn editable(&self) -> bool {
        false
    }

    /// Called when the UI language changed and text must re-measure.
    fn language_changed(&mut self, widget: &mut Widget) {
        _ = widget;
    }
}

// -- Default painter --

const STAGE_BACKGROUND: DrawState = DrawState::START;
const STAGE_BORDER: DrawState = DrawState(1);
const STAGE_BORDER_INNER: DrawState = DrawState(2);

/// The stock behavior: paints the background and border styles from the
/// widget record and nothing else.
///
/// Containers and spacers use it as-is; real controls embed the same staging
/// pattern and add content steps after the border.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPainter;

impl DefaultPainter {
    fn paint_background(cx: &mut PaintCx<'_>, driver: &mut dyn DisplayDriver, scheme: &Scheme) {
        match cx.widget.background {
            Background::None => {}
            Background::Fill => driver.fill_rect(cx.clip, scheme.base, cx.alpha),
            Background::Cache => {
                if let Some(cache) = cx.widget.cache.as_ref() {
                    // The driver clips the blit to the sub-frame rect.
                    driver.blit(cache.rect, &cache.pixels);
                } else {
                    // First paint: capture whatever is underneath the widget.
                    let rect = cx.bounds;
                    let len = (rect.width.max(0) as usize) * (rect.height.max(0) as usize);
                    let mut pixels = vec![Color::BLACK; len];
                    driver.read_region(rect, &mut pixels);
                    cx.widget.cache = Some(PixelCache { rect, pixels });
                }
            }
        }
    }

    fn paint_border_outer(
        cx: &PaintCx<'_>,
        driver: &mut dyn DisplayDriver,
        scheme: &Scheme,
    ) -> DrawStep {
        let r = cx.bounds;
        let a = cx.alpha;
        match cx.widget.border {
            Border::None => DrawStep::Done,
            Border::Line => {
                let c = scheme.shadow_dark;
                driver.draw_line(r.x, r.y, r.right(), r.y, c, a);
                driver.draw_line(r.x, r.bottom(), r.right(), r.bottom(), c, a);
                driver.draw_line(r.x, r.y, r.x, r.bottom(), c, a);
                driver.draw_line(r.right(), r.y, r.right(), r.bottom(), c, a);
                DrawStep::Done
            }
            Border::Bevel => {
                driver.draw_line(r.x, r.y, r.right(), r.y, scheme.highlight_light, a);
                driver.draw_line(r.x, r.y, r.x, r.bottom(), scheme.highlight_light, a);
                driver.draw_line(r.x, r.bottom(), r.right(), r.bottom(), scheme.shadow_dark, a);
                driver.draw_line(r.right(), r.y, r.right(), r.bottom(), scheme.shadow_dark, a);
                DrawStep::Continue
            }
        }
    }

    fn paint_border_inner(cx: &PaintCx<'_>, driver: &mut dyn DisplayDriver, scheme: &Scheme) {
        let r = cx.bounds;
        let a = cx.alpha;
        let (x0, y0) = (r.x + 1, r.y + 1);
        let (x1, y1) = (r.right() - 1, r.bottom() - 1);
        driver.draw_line(x0, y0, x1, y0, scheme.highlight, a);
        driver.draw_line(x0, y0, x0, y1, scheme.highlight, a);
        driver.draw_line(x0, y1, x1, y1, scheme.shadow, a);
        driver.draw_line(x1, y0, x1, y1, scheme.shadow, a);
    }
}

impl WidgetBehavior for DefaultPainter {
    fn draw_step(&mut self, cx: &mut PaintCx<'_>, driver: &mut dyn DisplayDriver) -> DrawStep {
        let Some(scheme) = cx.widget.scheme else {
            return DrawStep::Done;
        };
        match cx.widget.draw_state() {
            STAGE_BACKGROUND => {
                Self::paint_background(cx, driver, &scheme);
                cx.widget.set_draw_state(STAGE_BORDER);
                DrawStep::Continue
            }
            STAGE_BORDER => {
                let step = Self::paint_border_outer(cx, driver, &scheme);
                if step == DrawStep::Continue {
                    cx.widget.set_draw_state(STAGE_BORDER_INNER);
                }
                step
            }
            STAGE_BORDER_INNER => {
                Self::paint_border_inner(cx, driver, &scheme);
                DrawStep::Done
            }
            _ => DrawStep::Done,
        }
    }
}
