//! Tests for linked emitters: federation of emit and hook chains across
//! instances, prefix remapping, ordering, and unlink.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};

use hookbus::{Emitter, Listener, listener_fn, target_fn};

fn counter(count: &Arc<AtomicUsize>) -> Arc<dyn Listener> {
    let count = count.clone();
    listener_fn(move |_payload| {
        count.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    })
}

fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Arc<dyn Listener> {
    let log = log.clone();
    let tag = tag.to_string();
    listener_fn(move |_payload| {
        log.lock().unwrap().push(tag.clone());
        Ok(None)
    })
}

#[tokio::test]
async fn test_link_pulls_target_listeners_one_way() {
    let primary = Emitter::new();
    let secondary = Emitter::new();
    let primary_count = Arc::new(AtomicUsize::new(0));
    let secondary_count = Arc::new(AtomicUsize::new(0));

    primary.on("foo", counter(&primary_count)).unwrap();
    secondary.on("foo", counter(&secondary_count)).unwrap();

    primary.link(&secondary);

    // linked: primary notifies both
    primary.emit("foo", vec![]).unwrap().await.unwrap();
    assert_eq!(primary_count.load(Ordering::SeqCst), 1);
    assert_eq!(secondary_count.load(Ordering::SeqCst), 1);

    // not reciprocal
    secondary.emit("foo", vec![]).unwrap().await.unwrap();
    assert_eq!(primary_count.load(Ordering::SeqCst), 1);
    assert_eq!(secondary_count.load(Ordering::SeqCst), 2);

    primary.unlink(&secondary);
    primary.emit("foo", vec![]).unwrap().await.unwrap();
    assert_eq!(primary_count.load(Ordering::SeqCst), 2);
    assert_eq!(secondary_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_prefixed_link_misses_unprefixed_listeners() {
    let primary = Emitter::new();
    let secondary = Emitter::new();
    let secondary_count = Arc::new(AtomicUsize::new(0));

    secondary.on("foo", counter(&secondary_count)).unwrap();
    primary.link_with_prefix(&secondary, "baz:");

    // the link reads `baz:foo`, which has no listeners
    primary.emit("foo", vec![]).unwrap().await.unwrap();
    assert_eq!(secondary_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_prefixed_link_hits_prefixed_listeners() {
    let primary = Emitter::new();
    let secondary = Emitter::new();
    let secondary_count = Arc::new(AtomicUsize::new(0));

    secondary.on("baz:foo", counter(&secondary_count)).unwrap();
    primary.link_with_prefix(&secondary, "baz:");

    primary.emit("foo", vec![]).unwrap().await.unwrap();
    assert_eq!(secondary_count.load(Ordering::SeqCst), 1);

    // the target's own emission of `foo` does not match its `baz:foo`
    secondary.emit("foo", vec![]).unwrap().await.unwrap();
    assert_eq!(secondary_count.load(Ordering::SeqCst), 1);

    primary.unlink(&secondary);
    primary.emit("foo", vec![]).unwrap().await.unwrap();
    assert_eq!(secondary_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_linking_twice_fires_twice_and_unlink_removes_both() {
    let primary = Emitter::new();
    let secondary = Emitter::new();
    let count = Arc::new(AtomicUsize::new(0));

    secondary.on("foo", counter(&count)).unwrap();
    primary.link(&secondary);
    primary.link(&secondary);

    primary.emit("foo", vec![]).unwrap().await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);

    primary.unlink(&secondary);
    primary.emit("foo", vec![]).unwrap().await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_local_listeners_fire_before_linked_at_equal_priority() {
    let primary = Emitter::new();
    let secondary = Emitter::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    secondary.on("x", recorder(&log, "linked")).unwrap();
    primary.on("x", recorder(&log, "local")).unwrap();
    primary.link(&secondary);

    primary.emit("x", vec![]).unwrap().await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["local", "linked"]);
}

#[tokio::test]
async fn test_linked_priority_outranks_local_default() {
    let primary = Emitter::new();
    let secondary = Emitter::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    primary.on("x", recorder(&log, "local")).unwrap();
    secondary
        .on_with_priority("x", 5, recorder(&log, "linked-hi"))
        .unwrap();
    primary.link(&secondary);

    primary.emit("x", vec![]).unwrap().await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["linked-hi", "local"]);
}

#[tokio::test]
async fn test_hook_chains_consult_linked_listeners() {
    let primary = Emitter::new();
    let secondary = Emitter::new();

    secondary
        .on(
            "render",
            listener_fn(|payload| {
                payload.args[0] = json!("intercepted");
                Ok(None)
            }),
        )
        .unwrap();
    primary.link(&secondary);

    let hooked = primary
        .hook(
            "render",
            target_fn(|_ctx, args| Ok(args.first().cloned().unwrap_or(Value::Null))),
        )
        .unwrap();

    assert_eq!(
        hooked.call(vec![json!("plain")]).await.unwrap(),
        json!("intercepted")
    );

    primary.unlink(&secondary);
    assert_eq!(
        hooked.call(vec![json!("plain")]).await.unwrap(),
        json!("plain")
    );
}
