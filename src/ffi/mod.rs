use std::sync::LazyLock;

pub mod bindings;
pub mod syscall;

// Reads an unaligned value at the pointer, then offsets the
// pointer by the size of the pointee type.
//
// Callers must have checked that `size_of::<T>()` bytes are readable.
#[inline]
pub unsafe fn deref_offset<T: Copy>(ptr: &mut *const u8) -> T {
    let val = (*ptr as *const T).read_unaligned();
    *ptr = ptr.add(size_of::<T>());
    val
}

pub static PAGE_SIZE: LazyLock<usize> = LazyLock::new(|| {
    let name = libc::_SC_PAGE_SIZE;
    let size = unsafe { libc::sysconf(name) };
    size as _
});

pub type Attr = bindings::perf_event_attr;
pub type Metadata = bindings::perf_event_mmap_page;
pub type Header = bindings::perf_event_header;
