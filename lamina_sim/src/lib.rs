// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Software display simulation for exercising the redraw engine.
//!
//! Everything `lamina_core` asks of real scan-out hardware is modeled here in
//! plain memory: [`display::SimDisplay`] implements
//! [`DisplayDriver`](lamina_core::hal::DisplayDriver) over per-layer swap
//! chains of ARGB8888 pixels and journals every draw that lands, and
//! [`ledger::RedrawLedger`] grades how tightly damage tracking is holding to
//! "repaint only what changed".
//!
//! The crate exists for tests and demos; nothing here is sized or paced for a
//! real target. Its own test suite drives a full
//! [`Context`](lamina_core::context::Context) against the simulator and
//! asserts on pixels rather than on the engine's bookkeeping.

pub mod display;
pub mod ledger;

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use lamina_core::context::{Context, PaintFlow};
    use lamina_core::draw::{PreemptLevel, Scheme};
    use lamina_core::hal::{Color, HwLayerId};
    use lamina_core::layer::LayerFrameState;
    use lamina_core::rect::Rect;
    use lamina_core::screen::Screen;
    use lamina_core::trace::Tracer;
    use lamina_core::widget::WidgetId;

    use crate::display::{DrawRecord, SimDisplay};
    use crate::ledger::{Efficiency, RedrawLedger, RedrawSample};

    const L0: HwLayerId = HwLayerId(0);
    const W: i32 = 100;
    const H: i32 = 100;
    const RED: Color = Color::rgb(0xFF, 0x00, 0x00);
    const BLUE: Color = Color::rgb(0x00, 0x00, 0xFF);

    /// Context with one 100x100 layer at slot 0, shown on a simulator.
    fn shown() -> (Context, SimDisplay, WidgetId) {
        let mut ctx = Context::new();
        let mut display = SimDisplay::new(480, 272);
        let screen = ctx.add_screen(Screen::new());
        let root = ctx.create_layer(screen, 0, Rect::new(0, 0, W, H)).unwrap();
        ctx.show_screen(screen, &mut display).unwrap();
        (ctx, display, root)
    }

    fn pump(ctx: &mut Context, display: &mut SimDisplay) {
        while ctx.paint(display, &mut Tracer::none()) == PaintFlow::Yielded {}
    }

    fn attach_child(ctx: &mut Context, parent: WidgetId, rect: Rect) -> WidgetId {
        let child = ctx.create_default_widget();
        ctx.widgets_mut().widget_mut(child).rect = rect;
        ctx.widgets_mut().add_child(parent, child);
        child
    }

    fn scheme_with(base: Color) -> Scheme {
        Scheme { base, ..Scheme::DEFAULT }
    }

    #[test]
    fn first_frame_writes_every_layer_pixel_once() {
        let (mut ctx, mut display, _root) = shown();
        pump(&mut ctx, &mut display);

        assert_eq!(
            display.journal(),
            &[
                DrawRecord::Fill {
                    layer: L0,
                    rect: Rect::new(0, 0, W, H),
                    color: Scheme::DEFAULT.base,
                    alpha: 255,
                },
                DrawRecord::Swap { layer: L0 },
            ]
        );
        assert_eq!(display.pixels_written(), (W * H) as u64);
        let counts = display.write_counts(L0).unwrap();
        assert!(counts.iter().all(|&c| c == 1));
        assert_eq!(display.pixel(L0, 0, 0), Some(Scheme::DEFAULT.base));
        assert_eq!(display.pixel(L0, W - 1, H - 1), Some(Scheme::DEFAULT.base));
    }

    #[test]
    fn moved_widget_repaints_exactly_the_two_rects() {
        let (mut ctx, mut display, root) = shown();
        let child = attach_child(&mut ctx, root, Rect::new(10, 10, 20, 20));
        ctx.set_scheme(child, Some(scheme_with(RED))).unwrap();
        pump(&mut ctx, &mut display);
        display.clear_journal();

        ctx.move_widget(child, 30, 10).unwrap();
        {
            let layer = ctx.screen(0).unwrap().layer(0).unwrap();
            assert_eq!(
                layer.current_damage().as_slice(),
                [Rect::new(10, 10, 20, 20), Rect::new(30, 10, 20, 20)]
            );
        }
        pump(&mut ctx, &mut display);

        // Edge-adjacent rects stay separate sub-frames: old spot gets the
        // layer background, new spot gets the child, nothing else is touched
        // and no pixel is written twice.
        {
            let layer = ctx.screen(0).unwrap().layer(0).unwrap();
            assert_eq!(
                layer.frame_rects().as_slice(),
                [Rect::new(10, 10, 20, 20), Rect::new(30, 10, 20, 20)]
            );
        }
        assert_eq!(
            display.journal(),
            &[
                DrawRecord::Fill {
                    layer: L0,
                    rect: Rect::new(10, 10, 20, 20),
                    color: Scheme::DEFAULT.base,
                    alpha: 255,
                },
                DrawRecord::Fill {
                    layer: L0,
                    rect: Rect::new(30, 10, 20, 20),
                    color: RED,
                    alpha: 255,
                },
                DrawRecord::Swap { layer: L0 },
            ]
        );
        let touched = Rect::new(10, 10, 40, 20);
        let counts = display.write_counts(L0).unwrap();
        for y in 0..H {
            for x in 0..W {
                let expected = u32::from(touched.contains_point(x, y));
                assert_eq!(counts[(y * W + x) as usize], expected, "pixel ({x}, {y})");
            }
        }
        assert_eq!(display.pixel(L0, 11, 11), Some(Scheme::DEFAULT.base));
        assert_eq!(display.pixel(L0, 31, 11), Some(RED));
    }

    #[test]
    fn overlapping_damage_collapses_to_one_fill() {
        let (mut ctx, mut display, _root) = shown();
        pump(&mut ctx, &mut display);
        display.clear_journal();

        ctx.inject_damage(0, Rect::new(0, 0, 50, 50), false, &mut Tracer::none())
            .unwrap();
        ctx.inject_damage(0, Rect::new(40, 0, 50, 50), false, &mut Tracer::none())
            .unwrap();
        pump(&mut ctx, &mut display);

        assert_eq!(
            display.journal(),
            &[
                DrawRecord::Fill {
                    layer: L0,
                    rect: Rect::new(0, 0, 90, 50),
                    color: Scheme::DEFAULT.base,
                    alpha: 255,
                },
                DrawRecord::Swap { layer: L0 },
            ]
        );
        assert_eq!(display.pixels_written(), 4500);
    }

    #[test]
    fn mid_frame_damage_lands_in_the_next_swap() {
        let (mut ctx, mut display, root) = shown();
        let child = attach_child(&mut ctx, root, Rect::new(10, 10, 20, 20));
        ctx.set_scheme(child, Some(scheme_with(RED))).unwrap();
        pump(&mut ctx, &mut display);
        display.clear_journal();

        ctx.set_preempt_level(PreemptLevel::Level1);
        ctx.invalidate(child).unwrap();
        assert_eq!(
            ctx.paint(&mut display, &mut Tracer::none()),
            PaintFlow::Yielded
        );

        // Damage injected into the open frame defers; the in-flight rect set
        // is not corrupted.
        ctx.inject_damage(0, Rect::new(60, 60, 10, 10), false, &mut Tracer::none())
            .unwrap();
        {
            let layer = ctx.screen(0).unwrap().layer(0).unwrap();
            assert_eq!(layer.frame_state(), LayerFrameState::InProgress);
            assert_eq!(
                layer.current_damage().as_slice(),
                [Rect::new(10, 10, 20, 20)]
            );
            assert_eq!(
                layer.pending_damage().as_slice(),
                [Rect::new(60, 60, 10, 10)]
            );
        }

        pump(&mut ctx, &mut display);
        let swaps = display
            .journal()
            .iter()
            .filter(|r| matches!(r, DrawRecord::Swap { .. }))
            .count();
        assert_eq!(swaps, 2, "deferred damage must bounce into a second frame");
        {
            let layer = ctx.screen(0).unwrap().layer(0).unwrap();
            assert_eq!(layer.frame_state(), LayerFrameState::Ready);
            assert!(layer.pending_damage().is_empty());
        }
        assert_eq!(display.pixel(L0, 11, 11), Some(RED));
        assert_eq!(display.pixel(L0, 65, 65), Some(Scheme::DEFAULT.base));
        let counts = display.write_counts(L0).unwrap();
        assert_eq!(counts[(65 * W + 65) as usize], 1);
    }

    #[test]
    fn occluded_widget_never_reaches_the_framebuffer() {
        let cover = Rect::new(10, 10, 30, 30);
        let (mut ctx, mut display, root) = shown();
        let below = attach_child(&mut ctx, root, cover);
        let above = attach_child(&mut ctx, root, cover);
        ctx.set_scheme(below, Some(scheme_with(RED))).unwrap();
        ctx.set_scheme(above, Some(scheme_with(BLUE))).unwrap();
        pump(&mut ctx, &mut display);

        // The opaque sibling painted later covers `below` completely; its
        // color never lands.
        assert!(
            display
                .journal()
                .iter()
                .all(|r| !matches!(r, DrawRecord::Fill { color, .. } if *color == RED)),
            "journal: {:?}",
            display.journal()
        );
        assert_eq!(display.pixel(L0, 20, 20), Some(BLUE));

        // Blending the cover re-admits `below` to the paint walk.
        display.clear_journal();
        ctx.set_alpha(above, true, 128).unwrap();
        pump(&mut ctx, &mut display);
        assert_eq!(
            display.journal(),
            &[
                DrawRecord::Fill { layer: L0, rect: cover, color: RED, alpha: 255 },
                DrawRecord::Fill { layer: L0, rect: cover, color: BLUE, alpha: 128 },
                DrawRecord::Swap { layer: L0 },
            ]
        );
        assert_eq!(display.pixel(L0, 20, 20), Some(Color::rgb(127, 0, 128)));
    }

    #[test]
    fn double_buffered_frames_converge_outside_queued_replay() {
        let mut ctx = Context::new();
        let mut display = SimDisplay::new(480, 272);
        let screen = ctx.add_screen(Screen::new());
        let root = ctx.create_layer(screen, 0, Rect::new(0, 0, W, H)).unwrap();
        ctx.screen_mut(screen)
            .unwrap()
            .layer_mut(0)
            .unwrap()
            .set_buffer_count(2)
            .unwrap();
        ctx.show_screen(screen, &mut display).unwrap();
        let child = attach_child(&mut ctx, root, Rect::new(10, 10, 20, 20));
        ctx.set_scheme(child, Some(scheme_with(RED))).unwrap();

        // Frame 0 paints one buffer; the other has never been written.
        pump(&mut ctx, &mut display);
        assert_eq!(display.buffer_count(L0), 2);
        assert!(!display.buffers_coherent(L0));

        // Frame 1 replays the bootstrap full-layer catch-up into the other
        // buffer; with the scene unchanged the chain converges exactly.
        ctx.inject_damage(0, Rect::new(0, 0, 1, 1), false, &mut Tracer::none())
            .unwrap();
        pump(&mut ctx, &mut display);
        assert!(display.buffers_coherent(L0));

        // Steady state: after every frame the off-screen buffer is stale by
        // exactly the damage queued for replay, and nothing else.
        let mut x = 10;
        for step in 0..3 {
            x += 20;
            ctx.move_widget(child, x, 10).unwrap();
            pump(&mut ctx, &mut display);

            let layer = ctx.screen(0).unwrap().layer(0).unwrap();
            let replay = layer.prev_damage().as_slice();
            assert!(!replay.is_empty(), "step {step}");
            assert!(
                display.buffers_match_except(L0, replay),
                "step {step}: stale pixels outside the replay set"
            );
            assert_eq!(display.pixel(L0, x + 1, 11), Some(RED), "step {step}");
            assert_eq!(
                display.pixel(L0, x - 19, 11),
                Some(Scheme::DEFAULT.base),
                "step {step}: old spot must show the layer background"
            );
        }
    }

    #[test]
    fn incremental_redraw_grades_a() {
        let (mut ctx, mut display, root) = shown();
        let child = attach_child(&mut ctx, root, Rect::new(10, 10, 20, 20));
        pump(&mut ctx, &mut display);

        let bounds = Rect::new(0, 0, W, H);
        let mut ledger = RedrawLedger::<8>::default();
        for (i, &x) in [40, 10, 40, 10].iter().enumerate() {
            display.clear_journal();
            ctx.move_widget(child, x, 10).unwrap();
            pump(&mut ctx, &mut display);

            let layer = ctx.screen(0).unwrap().layer(0).unwrap();
            let sample = RedrawSample::for_frame(
                layer.frame_rects().as_slice(),
                bounds,
                display.pixels_written(),
            );
            assert_eq!(sample.pixels_damaged, 800, "frame {i}");
            let report = ledger.observe(sample);
            assert_eq!(report.grade, Efficiency::A, "frame {i}");
            assert!((report.overdraw - 1.0).abs() < 1e-9, "frame {i}");
            assert_eq!(report.full_redraws, 0, "frame {i}");
        }
    }

    #[test]
    fn full_layer_churn_degrades_the_grade() {
        let (mut ctx, mut display, _root) = shown();
        pump(&mut ctx, &mut display);

        let bounds = Rect::new(0, 0, W, H);
        let mut ledger = RedrawLedger::<8>::default();
        let mut grade = Efficiency::A;
        for _ in 0..5 {
            display.clear_journal();
            ctx.inject_damage(0, bounds, false, &mut Tracer::none())
                .unwrap();
            pump(&mut ctx, &mut display);

            let layer = ctx.screen(0).unwrap().layer(0).unwrap();
            let sample = RedrawSample::for_frame(
                layer.frame_rects().as_slice(),
                bounds,
                display.pixels_written(),
            );
            assert!(sample.full_redraw);
            grade = ledger.observe(sample).grade;
        }
        assert_eq!(grade, Efficiency::D);
    }
}
