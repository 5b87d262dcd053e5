//! The render loop: owns the surface's visibility lifecycle.
//!
//! ```text
//!            show(frame)               surface hidden
//!  ┌──────────┐ ─────────► ┌─────────┐ ─────────────► ┌────────────┐
//!  │  start   │            │Rendering│                │ Idle-check │
//!  └──────────┘            └─────────┘ ◄───────────── └────────────┘
//!                                     pending update        │
//!                                                           │ nothing pending
//!                                                           ▼
//!                                                       finished
//! ```
//!
//! The loop never polls.  It sleeps in
//! [`Surface::wait_until_hidden`] and notices new requests only when the
//! surface hides, which the accept loop forces by raising the
//! [`HideSignal`](crate::surface::HideSignal).

use crate::config::Layout;
use crate::server::ServerState;
use crate::shutdown::CancelToken;
use crate::traits::{Frame, Surface};
use log::{debug, info};

/// Render requests from `state` until nothing is pending or `cancel` fires.
///
/// Returns the number of frames shown.  On return the state is marked
/// finished, so late requests are refused rather than silently queued.
pub fn run_render_loop<S: Surface>(
    surface: &mut S,
    state: &ServerState,
    layout: &Layout,
    cancel: &CancelToken,
) -> Result<usize, S::Error> {
    let mut request = state.take_current();
    let mut shown = 0;

    loop {
        //  Rendering
        let frame = Frame::from_request(&request, layout);
        debug!("rendering {:?}", frame);
        let outcome = surface
            .show(&frame)
            .and_then(|()| surface.wait_until_hidden());
        surface.destroy();
        if let Err(e) = outcome {
            state.finish();
            return Err(e);
        }
        shown += 1;

        //  Idle-check
        if cancel.is_cancelled() {
            info!("render loop cancelled");
            state.finish();
            break;
        }
        match state.idle_check() {
            Some(next) => {
                debug!("update pending, re-rendering");
                request = next;
            }
            None => {
                info!("no pending update, render loop finished");
                break;
            }
        }
    }

    Ok(shown)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::request::DisplayRequest;
    use crate::surface::HideSignal;
    use crate::traits::Line;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Test double that records every frame and treats one second of
    /// request timeout as `unit`, so scenarios run fast.
    pub(crate) struct RecordingSurface {
        pub frames: Arc<Mutex<Vec<Frame>>>,
        pub hide: HideSignal,
        pub unit: Duration,
        timeout: Option<Duration>,
        /// Fail the `show` call with this index.
        pub fail_on: Option<usize>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("recording surface failure")]
    pub(crate) struct RecordingError;

    impl RecordingSurface {
        pub(crate) fn new(unit: Duration) -> Self {
            Self {
                frames: Arc::default(),
                hide: HideSignal::new(),
                unit,
                timeout: None,
                fail_on: None,
            }
        }

        pub(crate) fn progress_log(frames: &[Frame]) -> Vec<i32> {
            frames
                .iter()
                .filter_map(|f| {
                    f.lines.iter().find_map(|l| match l {
                        Line::Percentage(p) => Some(*p),
                        Line::Text(_) => None,
                    })
                })
                .collect()
        }
    }

    impl Surface for RecordingSurface {
        type Error = RecordingError;

        fn show(&mut self, frame: &Frame) -> Result<(), RecordingError> {
            let mut frames = self.frames.lock().unwrap();
            if self.fail_on == Some(frames.len()) {
                return Err(RecordingError);
            }
            frames.push(frame.clone());
            self.timeout = frame.timeout.map(|t| self.unit * t.as_secs() as u32);
            Ok(())
        }

        fn wait_until_hidden(&mut self) -> Result<(), RecordingError> {
            self.hide.wait(self.timeout);
            Ok(())
        }

        fn destroy(&mut self) {
            self.timeout = None;
        }

        fn hide_signal(&self) -> HideSignal {
            self.hide.clone()
        }
    }

    fn req(progress: i32) -> DisplayRequest {
        DisplayRequest {
            progress,
            timeout_secs: 1,
            label: "BUILD".into(),
            ..Default::default()
        }
    }

    #[test]
    fn single_request_renders_once_and_finishes() {
        let mut surface = RecordingSurface::new(Duration::from_millis(20));
        let state = ServerState::new(req(10), surface.hide_signal());
        let shown =
            run_render_loop(&mut surface, &state, &Layout::default(), &CancelToken::new()).unwrap();
        assert_eq!(shown, 1);
        assert!(state.is_finished());
        assert!(!state.pending_update());
    }

    #[test]
    fn update_before_first_frame_is_rendered_once() {
        let mut surface = RecordingSurface::new(Duration::from_millis(20));
        let state = ServerState::new(req(10), surface.hide_signal());
        // Queued before the loop starts: it replaces the initial request.
        assert!(state.install(req(55)));

        let shown =
            run_render_loop(&mut surface, &state, &Layout::default(), &CancelToken::new()).unwrap();
        assert_eq!(shown, 1);
        let frames = surface.frames.lock().unwrap();
        assert_eq!(RecordingSurface::progress_log(&frames), vec![55]);
    }

    #[test]
    fn update_during_frame_causes_rerender() {
        let mut surface = RecordingSurface::new(Duration::from_millis(20));
        // Long timeout: only the forced hide ends the first frame.
        let initial = DisplayRequest {
            timeout_secs: 100,
            ..req(10)
        };
        let state = Arc::new(ServerState::new(initial, surface.hide_signal()));
        let frames = surface.frames.clone();

        let installer = {
            let state = state.clone();
            std::thread::spawn(move || {
                while frames.lock().unwrap().is_empty() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                assert!(state.install(req(55)));
            })
        };

        let shown =
            run_render_loop(&mut surface, &state, &Layout::default(), &CancelToken::new()).unwrap();
        installer.join().unwrap();
        assert_eq!(shown, 2);
        let frames = surface.frames.lock().unwrap();
        assert_eq!(RecordingSurface::progress_log(&frames), vec![10, 55]);
    }

    #[test]
    fn cancel_stops_after_current_frame() {
        let mut surface = RecordingSurface::new(Duration::from_millis(20));
        let state = ServerState::new(req(10), surface.hide_signal());
        assert!(state.install(req(55)));
        let cancel = CancelToken::new();
        cancel.cancel();

        let shown = run_render_loop(&mut surface, &state, &Layout::default(), &cancel).unwrap();
        assert_eq!(shown, 1);
        assert!(state.is_finished());
        assert!(!state.pending_update());
    }

    #[test]
    fn surface_error_finishes_state() {
        let mut surface = RecordingSurface::new(Duration::from_millis(20));
        surface.fail_on = Some(0);
        let state = ServerState::new(req(10), surface.hide_signal());
        assert!(run_render_loop(&mut surface, &state, &Layout::default(), &CancelToken::new())
            .is_err());
        assert!(state.is_finished());
    }
}
