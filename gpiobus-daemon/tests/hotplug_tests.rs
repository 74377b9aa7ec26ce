//! Uevent handling: discriminator, action dispatch and startup reconciliation.

mod common;

use std::sync::atomic::Ordering;

use rstest::rstest;

use gpiobus_core::DeviceName;
use gpiobus_daemon::hotplug::{self, Handled};

use common::{cdev, count_warnings, path, registry, sysfs, uevent, FakeAccess, FakeTree, TreeOp};

#[rstest]
#[case::add("add")]
#[case::remove("remove")]
#[tokio::test]
async fn paired_uevents_mutate_the_registry_once(#[case] action: &str) {
    let access = FakeAccess::with_chips(&["gpiochip0"]);
    let tree = FakeTree::new();
    let mut registry = registry(&access, &tree);
    if action == "remove" {
        registry
            .export(&DeviceName::from("gpiochip0"))
            .await
            .expect("export");
    }
    let before = tree.ops().len();

    // The kernel sends the sysfs and character-device notifications in
    // either order.
    let first = hotplug::handle_uevent(&mut registry, uevent(action, sysfs("gpiochip0"))).await;
    let second = hotplug::handle_uevent(&mut registry, uevent(action, cdev("gpiochip0"))).await;

    assert_eq!(first, Handled::Ignored);
    let ops = tree.ops();
    assert_eq!(ops.len() - before, 1, "exactly one tree mutation: {ops:?}");
    match action {
        "add" => {
            assert_eq!(second, Handled::Exported);
            assert_eq!(ops.last(), Some(&TreeOp::Export(path("gpiochip0"))));
            assert!(registry.contains(&DeviceName::from("gpiochip0")));
        }
        _ => {
            assert_eq!(second, Handled::Unexported);
            assert_eq!(ops.last(), Some(&TreeOp::Unexport(path("gpiochip0"))));
            assert!(registry.is_empty());
        }
    }
}

#[tokio::test]
async fn sysfs_notifications_are_dropped_silently() {
    let access = FakeAccess::with_chips(&["gpiochip0"]);
    let tree = FakeTree::new();
    let mut registry = registry(&access, &tree);
    let (_guard, warnings) = count_warnings();

    for action in ["add", "remove", "move", "change"] {
        let handled = hotplug::handle_uevent(&mut registry, uevent(action, sysfs("gpiochip0"))).await;
        assert_eq!(handled, Handled::Ignored, "{action}");
    }

    assert!(tree.ops().is_empty());
    assert_eq!(access.opened(), 0);
    assert_eq!(warnings.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_action_warns_once_and_changes_nothing() {
    let access = FakeAccess::with_chips(&["gpiochip0"]);
    let tree = FakeTree::new();
    let mut registry = registry(&access, &tree);
    let (_guard, warnings) = count_warnings();

    let handled = hotplug::handle_uevent(&mut registry, uevent("move", cdev("gpiochip0"))).await;

    assert_eq!(handled, Handled::Unknown);
    assert!(tree.ops().is_empty());
    assert!(registry.is_empty());
    assert_eq!(warnings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn vanished_device_fails_with_a_warning() {
    let access = FakeAccess::with_chips(&["gpiochip0"]);
    access.unplug("gpiochip0");
    let tree = FakeTree::new();
    let mut registry = registry(&access, &tree);
    let (_guard, warnings) = count_warnings();

    let handled = hotplug::handle_uevent(&mut registry, uevent("add", cdev("gpiochip0"))).await;

    assert_eq!(handled, Handled::Failed);
    assert!(registry.is_empty());
    assert!(tree.ops().is_empty());
    assert_eq!(warnings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hotplugged_chip_after_startup_is_exported() {
    let access = FakeAccess::with_chips(&["gpiochip0"]);
    let tree = FakeTree::new();
    let mut registry = registry(&access, &tree);
    hotplug::reconcile(&mut registry, [cdev("gpiochip0")]).await;

    access.plug("gpiochip1", "usb-expander", 16);
    let handled = hotplug::handle_uevent(&mut registry, uevent("add", cdev("gpiochip1"))).await;

    assert_eq!(handled, Handled::Exported);
    assert_eq!(registry.names(), vec![DeviceName::from("gpiochip0"), DeviceName::from("gpiochip1")]);
    assert_eq!(
        tree.properties(&path("gpiochip1")).map(|props| props.num_lines),
        Some(16)
    );
}

#[tokio::test]
async fn reconcile_exports_only_character_devices() {
    let access = FakeAccess::with_chips(&["gpiochip0", "gpiochip1"]);
    let tree = FakeTree::new();
    let mut registry = registry(&access, &tree);

    let exported = hotplug::reconcile(
        &mut registry,
        [
            sysfs("gpiochip0"),
            cdev("gpiochip0"),
            sysfs("gpiochip1"),
            cdev("gpiochip1"),
            sysfs("gpio"),
        ],
    )
    .await;

    assert_eq!(exported, 2);
    assert_eq!(tree.paths(), vec![path("gpiochip0"), path("gpiochip1")]);
}

#[tokio::test]
async fn reconcile_skips_chips_that_fail_to_open() {
    let access = FakeAccess::with_chips(&["gpiochip1"]);
    let tree = FakeTree::new();
    let mut registry = registry(&access, &tree);
    let (_guard, warnings) = count_warnings();

    let exported =
        hotplug::reconcile(&mut registry, [cdev("gpiochip0"), cdev("gpiochip1")]).await;

    assert_eq!(exported, 1);
    assert_eq!(registry.names(), vec![DeviceName::from("gpiochip1")]);
    assert_eq!(warnings.load(Ordering::SeqCst), 1);
}
