//! Device record: mountpoint, SysInfo fields and capability queries

use crate::core::handle::{NativeHandle, NativeRecord, Record};
use crate::core::overlay::{read_string, take_string};
use crate::error::{c_path, c_string, check, Result};
use crate::record::adopt;
use crate::record::ipod_info::IpodInfo;
use gpod_native as ffi;
use std::path::{Path, PathBuf};
use std::ptr;
use tracing::debug;

impl NativeRecord for ffi::Itdb_Device {
    const KIND: &'static str = "device";

    unsafe fn free(ptr: *mut Self) {
        ffi::itdb_device_free(ptr);
    }
}

/// The iPod a database lives on
///
/// Databases own their device; [`Device::new`] creates a standalone one
/// for model probing before any database exists.
#[derive(Debug)]
pub struct Device {
    handle: NativeHandle<ffi::Itdb_Device>,
}

impl Record for Device {
    type Raw = ffi::Itdb_Device;

    fn from_handle(handle: NativeHandle<Self::Raw>) -> Self {
        Device { handle }
    }

    fn handle(&self) -> &NativeHandle<Self::Raw> {
        &self.handle
    }
}

impl Device {
    pub fn new() -> Result<Self> {
        adopt(ffi::itdb_device_new(), "itdb_device_new")
    }

    pub fn mountpoint(&self) -> Option<PathBuf> {
        unsafe { read_string((*self.handle.as_ptr()).mountpoint) }.map(PathBuf::from)
    }

    /// Point the device at `mountpoint` and reload its SysInfo.
    pub fn set_mountpoint(&self, mountpoint: &Path) -> Result<()> {
        let mp = c_path(mountpoint)?;
        unsafe { ffi::itdb_device_set_mountpoint(self.handle.as_ptr(), mp.as_ptr()) };
        debug!(mountpoint = %mountpoint.display(), "device mountpoint set");
        Ok(())
    }

    /// Number of `Fnn` music directories, 0 when not yet known.
    pub fn music_dirs(&self) -> i32 {
        unsafe { (*self.handle.as_ptr()).musicdirs }
    }

    /// Reload SysInfo from the mountpoint. `false` when no file was found.
    pub fn read_sysinfo(&self) -> bool {
        unsafe { ffi::itdb_device_read_sysinfo(self.handle.as_ptr()) != ffi::FALSE }
    }

    /// One SysInfo field, e.g. `ModelNumStr`.
    pub fn sysinfo(&self, field: &str) -> Result<Option<String>> {
        let field = c_string(field)?;
        Ok(unsafe { take_string(ffi::itdb_device_get_sysinfo(self.handle.as_ptr(), field.as_ptr())) })
    }

    /// Set a SysInfo field in memory; `None` removes it.
    pub fn set_sysinfo(&self, field: &str, value: Option<&str>) -> Result<()> {
        let field = c_string(field)?;
        let value = value.map(c_string).transpose()?;
        unsafe {
            ffi::itdb_device_set_sysinfo(
                self.handle.as_ptr(),
                field.as_ptr(),
                value.as_ref().map_or(ptr::null(), |v| v.as_ptr()),
            )
        };
        Ok(())
    }

    /// Whether SysInfo has unsaved changes.
    pub fn sysinfo_changed(&self) -> bool {
        unsafe { (*self.handle.as_ptr()).sysinfo_changed != ffi::FALSE }
    }

    pub fn write_sysinfo(&self) -> Result<()> {
        let mut err = ptr::null_mut();
        unsafe {
            ffi::itdb_device_write_sysinfo(self.handle.as_ptr(), &mut err);
            check(err)
        }
    }

    /// Model row for this device. The "Invalid" row when SysInfo names no
    /// model, the "Unknown" row for an unrecognized one.
    pub fn ipod_info(&self) -> Option<IpodInfo> {
        let row = unsafe { ffi::itdb_device_get_ipod_info(self.handle.as_ptr()).as_ref() }?;
        Some(IpodInfo::from_static(row))
    }

    pub fn supports_artwork(&self) -> bool {
        unsafe { ffi::itdb_device_supports_artwork(self.handle.as_ptr()) != ffi::FALSE }
    }

    pub fn supports_photo(&self) -> bool {
        unsafe { ffi::itdb_device_supports_photo(self.handle.as_ptr()) != ffi::FALSE }
    }

    pub fn supports_video(&self) -> bool {
        unsafe { ffi::itdb_device_supports_video(self.handle.as_ptr()) != ffi::FALSE }
    }

    pub fn supports_podcast(&self) -> bool {
        unsafe { ffi::itdb_device_supports_podcast(self.handle.as_ptr()) != ffi::FALSE }
    }

    pub fn supports_chapter_image(&self) -> bool {
        unsafe { ffi::itdb_device_supports_chapter_image(self.handle.as_ptr()) != ffi::FALSE }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ipod_info::{IpodGeneration, IpodModel};
    use tempfile::TempDir;

    #[test]
    fn test_fresh_device_is_invalid_model() {
        let dev = Device::new().unwrap();
        assert_eq!(dev.mountpoint(), None);
        assert_eq!(dev.ipod_info().unwrap().model(), IpodModel::INVALID);
        assert!(!dev.supports_photo());
        assert!(!dev.read_sysinfo());
    }

    #[test]
    fn test_sysinfo_survives_reload() {
        let dir = TempDir::new().unwrap();
        let dev = Device::new().unwrap();
        dev.set_mountpoint(dir.path()).unwrap();
        dev.set_sysinfo("ModelNumStr", Some("xA079")).unwrap();
        assert!(dev.sysinfo_changed());
        dev.write_sysinfo().unwrap();
        assert!(!dev.sysinfo_changed());

        let again = Device::new().unwrap();
        again.set_mountpoint(dir.path()).unwrap();
        assert_eq!(again.sysinfo("ModelNumStr").unwrap().as_deref(), Some("xA079"));
        let info = again.ipod_info().unwrap();
        assert_eq!(info.generation(), IpodGeneration::PHOTO);
        assert!(again.supports_photo());
        assert!(!again.supports_video());
    }

    #[test]
    fn test_unrecognized_model_is_unknown() {
        let dev = Device::new().unwrap();
        dev.set_sysinfo("ModelNumStr", Some("xZZZZ")).unwrap();
        assert_eq!(dev.ipod_info().unwrap().model(), IpodModel::UNKNOWN);
        dev.set_sysinfo("ModelNumStr", None).unwrap();
        assert_eq!(dev.sysinfo("ModelNumStr").unwrap(), None);
    }

    #[test]
    fn test_write_without_mountpoint_fails() {
        let dev = Device::new().unwrap();
        assert!(dev.write_sysinfo().is_err());
    }
}
