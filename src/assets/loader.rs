use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{FutureExt, StreamExt};

use crate::error::AssetError;

use super::decode::{self, EnvironmentData, ModelData, PanelData};
use super::descriptor::{AssetDescriptor, AssetKind};

/// Decoded payload of a finished asset
#[derive(Debug)]
pub enum LoadedAsset {
    Model(ModelData),
    Panel(PanelData),
    Environment(EnvironmentData),
}

/// Completion notice for one descriptor
#[derive(Debug)]
pub enum LoadEvent {
    Loaded { name: String, asset: LoadedAsset },
    Failed { name: String, error: AssetError },
}

impl LoadEvent {
    pub fn name(&self) -> &str {
        match self {
            LoadEvent::Loaded { name, .. } | LoadEvent::Failed { name, .. } => name,
        }
    }
}

/// Decodes assets on worker threads, one per descriptor
///
/// Results come back over an unbounded channel in completion order. The
/// loader never touches the scene itself; callers drain events on their own
/// thread with [`poll`](Self::poll) or [`next_event`](Self::next_event).
pub struct AssetLoader {
    receiver: UnboundedReceiver<LoadEvent>,
    /// name -> path of every descriptor still in flight
    outstanding: HashMap<String, PathBuf>,
}

impl AssetLoader {
    pub fn spawn(descriptors: Vec<AssetDescriptor>) -> Self {
        let (sender, receiver) = mpsc::unbounded();
        let mut outstanding = HashMap::new();

        for descriptor in descriptors {
            log::debug!(
                "loading {} '{}' from {}",
                descriptor.kind_label(),
                descriptor.name,
                descriptor.path.display()
            );
            outstanding.insert(descriptor.name.clone(), descriptor.path.clone());
            spawn_worker(descriptor, sender.clone());
        }

        // Only workers hold senders now, so the channel closes once all are done
        drop(sender);

        Self {
            receiver,
            outstanding,
        }
    }

    /// Every event that has arrived so far, without blocking
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.next().now_or_never() {
                Some(Some(event)) => events.push(self.settle(event)),
                Some(None) => {
                    events.extend(self.drain_lost());
                    break;
                }
                None => break,
            }
        }
        events
    }

    /// Waits for the next event; `None` once every descriptor is accounted for
    pub async fn next_event(&mut self) -> Option<LoadEvent> {
        match self.receiver.next().await {
            Some(event) => Some(self.settle(event)),
            None => self.drain_lost().into_iter().next(),
        }
    }

    /// Descriptors not yet reported
    pub fn pending(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_finished(&self) -> bool {
        self.outstanding.is_empty()
    }

    fn settle(&mut self, event: LoadEvent) -> LoadEvent {
        self.outstanding.remove(event.name());
        event
    }

    /// Workers that exited without sending, e.g. after a decoder panic
    fn drain_lost(&mut self) -> Vec<LoadEvent> {
        self.outstanding
            .drain()
            .map(|(name, path)| LoadEvent::Failed {
                name,
                error: AssetError::WorkerLost(path),
            })
            .collect()
    }
}

fn spawn_worker(descriptor: AssetDescriptor, sender: UnboundedSender<LoadEvent>) {
    let name = descriptor.name.clone();
    let path = descriptor.path.clone();
    let fallback = sender.clone();

    let spawned = thread::Builder::new()
        .name(format!("asset-{}", descriptor.name))
        .spawn(move || {
            let event = load(descriptor);
            // The receiver is gone only when the app is shutting down
            let _ = sender.unbounded_send(event);
        });

    if let Err(source) = spawned {
        let _ = fallback.unbounded_send(LoadEvent::Failed {
            name,
            error: AssetError::Io { path, source },
        });
    }
}

/// Decodes one descriptor synchronously
pub fn load(descriptor: AssetDescriptor) -> LoadEvent {
    let AssetDescriptor { name, path, kind } = descriptor;
    let result = match kind {
        AssetKind::Model { transform } => {
            decode::decode_model(&path, transform).map(LoadedAsset::Model)
        }
        AssetKind::Panel { size, transform } => {
            decode::decode_panel(&path, size, transform).map(LoadedAsset::Panel)
        }
        AssetKind::Environment => decode::decode_environment(&path).map(LoadedAsset::Environment),
    };

    match result {
        Ok(asset) => LoadEvent::Loaded { name, asset },
        Err(error) => LoadEvent::Failed { name, error },
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Matrix4, SquareMatrix};

    use super::*;

    fn missing(name: &str) -> AssetDescriptor {
        AssetDescriptor::panel(
            name,
            format!("no/such/dir/{}.png", name),
            [1.0, 1.0, 0.1],
            Matrix4::identity(),
        )
    }

    #[test]
    fn every_descriptor_reports_once() {
        let mut loader = AssetLoader::spawn(vec![missing("a"), missing("b"), missing("c")]);
        assert_eq!(loader.pending(), 3);

        let mut names = Vec::new();
        while let Some(event) = futures::executor::block_on(loader.next_event()) {
            assert!(matches!(event, LoadEvent::Failed { .. }));
            names.push(event.name().to_string());
        }
        names.sort();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(loader.is_finished());
    }

    #[test]
    fn poll_never_blocks_and_eventually_drains() {
        let mut loader = AssetLoader::spawn(vec![missing("only")]);
        let mut seen = Vec::new();
        for _ in 0..500 {
            seen.extend(loader.poll());
            if loader.is_finished() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(seen.len(), 1);
        assert!(loader.poll().is_empty());
    }

    #[test]
    fn empty_list_is_finished_immediately() {
        let mut loader = AssetLoader::spawn(Vec::new());
        assert!(loader.is_finished());
        assert!(futures::executor::block_on(loader.next_event()).is_none());
    }

    #[test]
    fn failure_keeps_the_path() {
        let event = load(missing("x"));
        match event {
            LoadEvent::Failed {
                error: AssetError::Io { path, .. },
                ..
            } => assert!(path.ends_with("x.png")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
