use tracing::{debug, warn};
use winit::event::WindowEvent;

use crate::{frame_scheduler::FrameOutcome, timer::FrameStats};

/// What a layer gets to see about the frame that just ran.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    pub outcome: FrameOutcome,
    /// Set once per second
    pub stats: Option<FrameStats>,
}

/// A piece of per frame application logic.
pub trait Layer {
    fn name(&self) -> &str;

    fn on_attach(&mut self) {}

    fn on_detach(&mut self) {}

    fn on_update(&mut self, _update: &FrameUpdate) {}

    /// Returns true if the event was handled and should not reach layers below.
    fn on_event(&mut self, _event: &WindowEvent) -> bool {
        false
    }
}

/// Layers followed by overlays. Updates run front to back, events back to front so overlays
/// see them first.
#[derive(Default)]
pub struct LayerStack {
    layers: Vec<Box<dyn Layer>>,
    // index of the first overlay
    overlay_start: usize,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `layer` after the other layers and before every overlay.
    pub fn push_layer(&mut self, mut layer: Box<dyn Layer>) {
        debug!("Pushing layer {}", layer.name());
        layer.on_attach();
        self.layers.insert(self.overlay_start, layer);
        self.overlay_start += 1;
    }

    pub fn push_overlay(&mut self, mut overlay: Box<dyn Layer>) {
        debug!("Pushing overlay {}", overlay.name());
        overlay.on_attach();
        self.layers.push(overlay);
    }

    pub fn pop_layer(&mut self, name: &str) -> Option<Box<dyn Layer>> {
        let Some(position) = self.layers[..self.overlay_start]
            .iter()
            .position(|layer| layer.name() == name)
        else {
            warn!("Failed to pop layer {} from the layer stack", name);
            return None;
        };
        self.overlay_start -= 1;
        let mut layer = self.layers.remove(position);
        layer.on_detach();
        Some(layer)
    }

    pub fn pop_overlay(&mut self, name: &str) -> Option<Box<dyn Layer>> {
        let Some(position) = self.layers[self.overlay_start..]
            .iter()
            .position(|overlay| overlay.name() == name)
        else {
            warn!("Failed to pop overlay {} from the layer stack", name);
            return None;
        };
        let mut overlay = self.layers.remove(self.overlay_start + position);
        overlay.on_detach();
        Some(overlay)
    }

    pub fn update(&mut self, update: &FrameUpdate) {
        for layer in &mut self.layers {
            layer.on_update(update);
        }
    }

    /// Offers `event` to every layer from the top down until one handles it.
    pub fn dispatch_event(&mut self, event: &WindowEvent) -> bool {
        self.layers
            .iter_mut()
            .rev()
            .any(|layer| layer.on_event(event))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Layer> {
        self.layers.iter().map(|layer| layer.as_ref())
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Drop for LayerStack {
    fn drop(&mut self) {
        for layer in self.layers.iter_mut().rev() {
            layer.on_detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recording {
        name: &'static str,
        log: Log,
        handles_events: bool,
    }

    impl Recording {
        fn boxed(name: &'static str, log: &Log) -> Box<dyn Layer> {
            Box::new(Self {
                name,
                log: Rc::clone(log),
                handles_events: false,
            })
        }
    }

    impl Layer for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn on_detach(&mut self) {
            self.log.borrow_mut().push(format!("detach {}", self.name));
        }

        fn on_update(&mut self, _update: &FrameUpdate) {
            self.log.borrow_mut().push(format!("update {}", self.name));
        }

        fn on_event(&mut self, _event: &WindowEvent) -> bool {
            self.log.borrow_mut().push(format!("event {}", self.name));
            self.handles_events
        }
    }

    fn names(stack: &LayerStack) -> Vec<String> {
        stack.iter().map(|layer| layer.name().to_string()).collect()
    }

    const UPDATE: FrameUpdate = FrameUpdate {
        outcome: FrameOutcome::Presented,
        stats: None,
    };

    #[test]
    fn test_layers_come_before_overlays() {
        let log = Log::default();
        let mut stack = LayerStack::new();
        stack.push_overlay(Recording::boxed("hud", &log));
        stack.push_layer(Recording::boxed("world", &log));
        stack.push_overlay(Recording::boxed("fps", &log));
        stack.push_layer(Recording::boxed("physics", &log));

        assert_eq!(names(&stack), ["world", "physics", "hud", "fps"]);
        assert_eq!(stack.len(), 4);
    }

    #[test]
    fn test_update_runs_in_stack_order() {
        let log = Log::default();
        let mut stack = LayerStack::new();
        stack.push_overlay(Recording::boxed("fps", &log));
        stack.push_layer(Recording::boxed("world", &log));
        stack.update(&UPDATE);

        assert_eq!(*log.borrow(), ["update world", "update fps"]);
    }

    #[test]
    fn test_events_go_top_down_until_handled() {
        let log = Log::default();
        let mut stack = LayerStack::new();
        stack.push_layer(Recording::boxed("world", &log));
        stack.push_layer(Box::new(Recording {
            name: "ui",
            log: Rc::clone(&log),
            handles_events: true,
        }));
        stack.push_overlay(Recording::boxed("fps", &log));

        assert!(stack.dispatch_event(&WindowEvent::CloseRequested));
        assert_eq!(*log.borrow(), ["event fps", "event ui"]);
    }

    #[test]
    fn test_pop_keeps_segments_apart() {
        let log = Log::default();
        let mut stack = LayerStack::new();
        stack.push_layer(Recording::boxed("world", &log));
        stack.push_overlay(Recording::boxed("fps", &log));

        // overlays can't be popped as layers and the other way around
        assert!(stack.pop_layer("fps").is_none());
        assert!(stack.pop_overlay("world").is_none());

        assert!(stack.pop_layer("world").is_some());
        stack.push_layer(Recording::boxed("physics", &log));
        assert_eq!(names(&stack), ["physics", "fps"]);
        assert!(log.borrow().contains(&"detach world".to_string()));
    }

    #[test]
    fn test_drop_detaches_top_down() {
        let log = Log::default();
        {
            let mut stack = LayerStack::new();
            stack.push_layer(Recording::boxed("world", &log));
            stack.push_overlay(Recording::boxed("fps", &log));
        }
        assert_eq!(*log.borrow(), ["detach fps", "detach world"]);
    }
}
