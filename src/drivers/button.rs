//! Ignore-mode button glue.
//!
//! ## Hardware
//!
//! Active-low momentary switch on [`BUTTON_GPIO`](crate::pins::BUTTON_GPIO)
//! with the internal pull-up enabled.  The GPIO fires on *both* edges; the
//! ISR samples the pin level to tell press from release and hands the edge
//! to [`IgnoreController::on_button_edge`], which classifies the gesture.
//!
//! | Gesture      | Condition                          | Effect              |
//! |--------------|------------------------------------|---------------------|
//! | Long press   | held > 2 s                         | ignore mode on      |
//! | Short press  | held in (0.5 s, 2 s]               | none                |
//! | Bounce       | held ≤ 0.5 s                       | none                |
//! | Re-press     | < 1 s after the previous release   | press ignored       |

use crate::app::ignore::{ButtonEdge, Gesture, IgnoreController};
use crate::app::ports::OneShotTimer;

/// Map a sampled pin level to an edge.  Low means pressed.
pub const fn edge_from_level(level_high: bool) -> ButtonEdge {
    if level_high {
        ButtonEdge::Released
    } else {
        ButtonEdge::Pressed
    }
}

/// ISR body.  Safe to call from interrupt context: atomics only, no
/// logging, no allocation.
pub fn on_button_interrupt<T: OneShotTimer>(
    ignore: &IgnoreController<T>,
    level_high: bool,
    now_ms: u32,
) -> Gesture {
    ignore.on_button_edge(edge_from_level(level_high), now_ms)
}
