//! Native stack capture
//!
//! Stack introspection needs the calling thread's most recent return
//! addresses. Whether those can be captured at all is platform-dependent,
//! so capture is a capability trait: a host implementation where the C
//! library provides backtrace(3), and a no-op fallback everywhere else so
//! introspection degrades to "nothing found" instead of failing.

/// Captures the calling thread's most recent return addresses
pub trait StackSampler {
    /// Fill `frames` with return addresses, most recent first.
    ///
    /// Returns the number of frames written; 0 when capture is
    /// unavailable. Best effort only.
    fn capture(&self, frames: &mut [usize]) -> usize;
}

/// Sampler backed by the platform's backtrace facility, when present
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSampler;

#[cfg(any(all(target_os = "linux", target_env = "gnu"), target_vendor = "apple"))]
impl StackSampler for HostSampler {
    fn capture(&self, frames: &mut [usize]) -> usize {
        if frames.is_empty() {
            return 0;
        }
        // Safety: backtrace writes at most frames.len() pointers, and
        // usize has the same layout as *mut c_void.
        let count = unsafe {
            libc::backtrace(
                frames.as_mut_ptr() as *mut *mut libc::c_void,
                frames.len() as libc::c_int,
            )
        };
        count.max(0) as usize
    }
}

#[cfg(not(any(all(target_os = "linux", target_env = "gnu"), target_vendor = "apple")))]
impl StackSampler for HostSampler {
    fn capture(&self, _frames: &mut [usize]) -> usize {
        0
    }
}

/// Sampler for platforms (or tests) without stack capture
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSampler;

impl StackSampler for UnsupportedSampler {
    fn capture(&self, _frames: &mut [usize]) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_sampler_captures_nothing() {
        let mut frames = [0usize; 10];
        assert_eq!(UnsupportedSampler.capture(&mut frames), 0);
    }

    #[test]
    fn test_host_sampler_respects_slice_bounds() {
        let mut frames = [0usize; 4];
        let count = HostSampler.capture(&mut frames);
        assert!(count <= 4);
    }

    #[test]
    fn test_host_sampler_empty_slice() {
        assert_eq!(HostSampler.capture(&mut []), 0);
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn test_host_sampler_captures_frames() {
        let mut frames = [0usize; 10];
        let count = HostSampler.capture(&mut frames);
        assert!(count > 0);
        assert!(frames[..count].iter().all(|&address| address != 0));
    }
}
