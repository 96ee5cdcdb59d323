mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use trellis_core::node::{NotifyCloser, NotifyStream};
use trellis_core::{BasicNode, Browser, JsonContainer, ModuleBuilder, TypeSpec};

fn notify_module() -> std::rc::Rc<trellis_core::Schema> {
    ModuleBuilder::new("m")
        .notification("update", |n| n.leaf("z", TypeSpec::new("string")))
        .finalize()
        .unwrap()
}

/// Provider whose `update` notification delivers one event from a
/// background thread, then waits for the closer
fn notify_provider() -> std::rc::Rc<dyn trellis_core::Node> {
    BasicNode::new()
        .on_child(|r| {
            if r.sel.schema().ident(r.meta) == "update" {
                let node = BasicNode::new()
                    .on_notify(|r| {
                        let stream = Arc::clone(&r.stream);
                        let path = r.sel.path().to_string();
                        let stopped = Arc::new(AtomicBool::new(false));
                        let seen = Arc::clone(&stopped);
                        let handle = std::thread::spawn(move || {
                            if !seen.load(Ordering::SeqCst) {
                                stream(trellis_core::node::NotifyMessage {
                                    path,
                                    event: json!({"z": "hello"}),
                                });
                            }
                        });
                        Ok(NotifyCloser::new(move || {
                            stopped.store(true, Ordering::SeqCst);
                            let _ = handle.join();
                        }))
                    })
                    .into_node();
                return Ok(Some(node));
            }
            Ok(None)
        })
        .into_node()
}

#[test]
fn test_notification_delivers_exactly_one_event() {
    let browser = Browser::new(notify_module(), notify_provider());
    let sub = browser.root().find("update");
    assert!(sub.last_err().is_none());

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let stream: NotifyStream = Arc::new(move |msg| {
        tx.lock().unwrap().send(msg).ok();
    });

    let mut closer = sub.notifications(stream).unwrap();

    let msg = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(msg.event, json!({"z": "hello"}));
    assert_eq!(msg.path, "/update");

    // closing is idempotent and stops further delivery
    closer.close();
    closer.close();
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn test_notify_unsupported_node_is_forbidden() {
    let schema = notify_module();
    let node = JsonContainer::new(json!({}));
    let browser = Browser::new(schema, node);

    // JsonContainer has no update child, navigation itself misses
    let sub = browser.root().find("update");
    assert!(sub.last_err().is_some());
}
