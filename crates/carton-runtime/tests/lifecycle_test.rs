//! Workspace lifecycle integration tests.
//!
//! A recording mounter stands in for the host mount utilities so the
//! tests can assert on call ordering and partial-failure behavior
//! without root privileges or a real overlay filesystem.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use carton_common::config::Layout;
use carton_common::error::{CartonError, Result};
use carton_common::types::ContainerId;
use carton_runtime::mount::Mounter;
use carton_runtime::workspace::WorkspaceManager;

// ── Recording mounter ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum MountCall {
    MountOverlay { merged: PathBuf },
    UnmountOverlay { merged: PathBuf, target_existed: bool },
    UnmountOverlayForced { merged: PathBuf },
    BindMount { source: PathBuf, target: PathBuf },
    Unbind { target: PathBuf },
}

#[derive(Debug, Default)]
struct RecordingMounter {
    calls: Arc<Mutex<Vec<MountCall>>>,
    fail_plain_unmount: bool,
    fail_forced_unmount: bool,
}

impl RecordingMounter {
    fn new() -> Self {
        Self::default()
    }

    fn calls(&self) -> Vec<MountCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn handle(&self) -> Arc<Mutex<Vec<MountCall>>> {
        Arc::clone(&self.calls)
    }

    fn push(&self, call: MountCall) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn mount_error(target: &Path) -> CartonError {
        CartonError::Mount {
            target: target.to_path_buf(),
            message: "injected failure".into(),
        }
    }
}

impl Mounter for RecordingMounter {
    fn mount_overlay(&self, _lower: &Path, _upper: &Path, _work: &Path, merged: &Path) -> Result<()> {
        self.push(MountCall::MountOverlay {
            merged: merged.to_path_buf(),
        });
        Ok(())
    }

    fn unmount_overlay(&self, merged: &Path) -> Result<()> {
        self.push(MountCall::UnmountOverlay {
            merged: merged.to_path_buf(),
            target_existed: merged.exists(),
        });
        if self.fail_plain_unmount {
            return Err(Self::mount_error(merged));
        }
        Ok(())
    }

    fn unmount_overlay_forced(&self, merged: &Path) -> Result<()> {
        self.push(MountCall::UnmountOverlayForced {
            merged: merged.to_path_buf(),
        });
        if self.fail_forced_unmount {
            return Err(Self::mount_error(merged));
        }
        Ok(())
    }

    fn bind_mount(&self, source: &Path, target: &Path) -> Result<()> {
        self.push(MountCall::BindMount {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
        });
        Ok(())
    }

    fn unbind(&self, target: &Path) -> Result<()> {
        self.push(MountCall::Unbind {
            target: target.to_path_buf(),
        });
        Ok(())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────

fn append_file(builder: &mut tar::Builder<File>, name: &str, data: &[u8]) {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, name, data)
        .expect("append data");
}

/// Writes a single-layer image archive for `image_name` into the layout.
fn seed_image(layout: &Layout, image_name: &str) {
    std::fs::create_dir_all(&layout.image_dir).expect("image dir");

    let layer_path = layout.image_dir.join("layer.tar");
    let mut layer = tar::Builder::new(File::create(&layer_path).expect("layer tar"));
    append_file(&mut layer, "etc/conf", b"from-image");
    layer.finish().expect("finish layer");

    let image_path = layout.image_archive(image_name);
    let mut image = tar::Builder::new(File::create(image_path).expect("image tar"));
    append_file(
        &mut image,
        "manifest.json",
        br#"[{"Config":"config.json","RepoTags":["test:latest"],"Layers":["layer.tar"]}]"#,
    );
    image
        .append_path_with_name(&layer_path, "layer.tar")
        .expect("append layer");
    image.finish().expect("finish image");
}

fn manager_with_recorder(layout: Layout, mounter: RecordingMounter) -> (WorkspaceManager, Arc<Mutex<Vec<MountCall>>>) {
    let calls = mounter.handle();
    (
        WorkspaceManager::with_mounter(layout, Box::new(mounter)),
        calls,
    )
}

fn index_of(calls: &[MountCall], pred: impl Fn(&MountCall) -> bool) -> usize {
    calls
        .iter()
        .position(pred)
        .expect("expected call not recorded")
}

// ── Build ────────────────────────────────────────────────────────────

#[test]
fn build_extracts_lower_and_mounts_overlay() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = Layout::rooted_at(dir.path());
    seed_image(&layout, "busybox");
    let (manager, calls) = manager_with_recorder(layout.clone(), RecordingMounter::new());

    let id = ContainerId::new("c1");
    let workspace = manager.build(&id, "busybox", None).expect("build");

    assert_eq!(
        std::fs::read(workspace.lower_dir.join("etc/conf")).expect("lower content"),
        b"from-image"
    );
    assert!(workspace.upper_dir.is_dir());
    assert!(workspace.work_dir.is_dir());
    assert!(workspace.merged_dir.is_dir());
    assert_eq!(
        calls.lock().expect("calls").clone(),
        vec![MountCall::MountOverlay {
            merged: layout.merged_dir(&id)
        }]
    );
}

#[test]
fn build_with_volume_binds_after_overlay_mount() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = Layout::rooted_at(dir.path());
    seed_image(&layout, "busybox");
    let (manager, calls) = manager_with_recorder(layout.clone(), RecordingMounter::new());

    let id = ContainerId::new("c1");
    let host = dir.path().join("shared");
    std::fs::create_dir_all(&host).expect("host dir");
    let spec = format!("{}:/data", host.display());

    let workspace = manager.build(&id, "busybox", Some(&spec)).expect("build");

    let calls = calls.lock().expect("calls").clone();
    let overlay = index_of(&calls, |c| matches!(c, MountCall::MountOverlay { .. }));
    let bind = index_of(&calls, |c| matches!(c, MountCall::BindMount { .. }));
    assert!(overlay < bind, "volume must be grafted onto the mounted overlay");

    // The container-side directory was created under merged.
    assert!(layout.merged_dir(&id).join("data").is_dir());
    assert!(workspace.volume.is_some());
}

#[test]
fn malformed_volume_spec_fails_before_any_side_effect() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = Layout::rooted_at(dir.path());
    seed_image(&layout, "busybox");
    let (manager, calls) = manager_with_recorder(layout.clone(), RecordingMounter::new());

    let id = ContainerId::new("c1");
    let result = manager.build(&id, "busybox", Some("onlyonepart"));

    assert!(matches!(result, Err(CartonError::Config { .. })));
    assert!(calls.lock().expect("calls").is_empty(), "no mount attempted");
    assert!(
        !layout.lower_dir(&id).exists(),
        "no extraction before spec validation"
    );
}

#[test]
fn missing_image_archive_aborts_build() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = Layout::rooted_at(dir.path());
    let (manager, calls) = manager_with_recorder(layout, RecordingMounter::new());

    let result = manager.build(&ContainerId::new("c1"), "ghost", None);
    assert!(matches!(result, Err(CartonError::Extraction { .. })));
    assert!(calls.lock().expect("calls").is_empty());
}

#[test]
fn existing_lower_layer_is_reused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = Layout::rooted_at(dir.path());
    let (manager, _calls) = manager_with_recorder(layout.clone(), RecordingMounter::new());

    let id = ContainerId::new("c1");
    let lower = layout.lower_dir(&id);
    std::fs::create_dir_all(&lower).expect("lower");
    std::fs::write(lower.join("marker"), "kept").expect("marker");

    // No image archive exists; build must succeed without extraction.
    let workspace = manager.build(&id, "ghost", None).expect("build");
    assert_eq!(
        std::fs::read_to_string(workspace.lower_dir.join("marker")).expect("read"),
        "kept"
    );
}

// ── Teardown ─────────────────────────────────────────────────────────

#[test]
fn round_trip_leaves_no_residual_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = Layout::rooted_at(dir.path());
    seed_image(&layout, "busybox");
    let (manager, _calls) = manager_with_recorder(layout.clone(), RecordingMounter::new());

    let id = ContainerId::new("c1");
    let _ = manager.build(&id, "busybox", None).expect("build");
    let report = manager.teardown(&id, None);

    assert!(report.is_clean(), "failures: {:?}", report.failures);
    assert!(!layout.container_root(&id).exists());
}

#[test]
fn teardown_orders_volume_before_overlay_before_removal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = Layout::rooted_at(dir.path());
    seed_image(&layout, "busybox");
    let (manager, calls) = manager_with_recorder(layout.clone(), RecordingMounter::new());

    let id = ContainerId::new("c1");
    let host = dir.path().join("shared");
    std::fs::create_dir_all(&host).expect("host dir");
    let spec = format!("{}:/data", host.display());

    let _ = manager.build(&id, "busybox", Some(&spec)).expect("build");
    let report = manager.teardown(&id, Some(&spec));
    assert!(report.is_clean(), "failures: {:?}", report.failures);

    let calls = calls.lock().expect("calls").clone();
    let unbind = index_of(&calls, |c| matches!(c, MountCall::Unbind { .. }));
    let unmount = index_of(&calls, |c| matches!(c, MountCall::UnmountOverlay { .. }));
    assert!(
        unbind < unmount,
        "volume must come off before the overlay underneath it"
    );

    // Directory removal came only after the unmount: the merged dir was
    // still present when the unmount call was issued, and is gone now.
    assert!(matches!(
        calls[unmount],
        MountCall::UnmountOverlay {
            target_existed: true,
            ..
        }
    ));
    assert!(!layout.container_root(&id).exists());
}

#[test]
fn busy_overlay_unmount_is_retried_forced() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = Layout::rooted_at(dir.path());
    seed_image(&layout, "busybox");
    let mounter = RecordingMounter {
        fail_plain_unmount: true,
        ..RecordingMounter::default()
    };
    let (manager, calls) = manager_with_recorder(layout.clone(), mounter);

    let id = ContainerId::new("c1");
    let _ = manager.build(&id, "busybox", None).expect("build");
    let report = manager.teardown(&id, None);

    // Forced retry succeeded, so the teardown is clean overall.
    assert!(report.is_clean(), "failures: {:?}", report.failures);
    let calls = calls.lock().expect("calls").clone();
    let plain = index_of(&calls, |c| matches!(c, MountCall::UnmountOverlay { .. }));
    let forced = index_of(&calls, |c| matches!(c, MountCall::UnmountOverlayForced { .. }));
    assert!(plain < forced);
    assert!(!layout.container_root(&id).exists());
}

#[test]
fn failed_unmounts_are_recorded_but_cleanup_continues() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = Layout::rooted_at(dir.path());
    seed_image(&layout, "busybox");
    let mounter = RecordingMounter {
        fail_plain_unmount: true,
        fail_forced_unmount: true,
        ..RecordingMounter::default()
    };
    let (manager, _calls) = manager_with_recorder(layout.clone(), mounter);

    let id = ContainerId::new("c1");
    let _ = manager.build(&id, "busybox", None).expect("build");
    let report = manager.teardown(&id, None);

    assert_eq!(report.failures.len(), 2, "plain and forced unmount failures");
    // Directory removal still ran.
    assert!(!layout.container_root(&id).exists());
}

#[test]
fn teardown_of_absent_workspace_is_clean() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = Layout::rooted_at(dir.path());
    let (manager, calls) = manager_with_recorder(layout, RecordingMounter::new());

    let report = manager.teardown(&ContainerId::new("never-built"), None);
    assert!(report.is_clean());
    assert!(calls.lock().expect("calls").is_empty());
}
