//! Doubly linked list primitive
//!
//! Mirrors the GLib `GList` contract: the list is identified by its head
//! node, an empty list is NULL, and every mutating call returns the
//! (possibly new) head. Nodes never own their `data`.

use crate::gpointer;
use crate::ledger::{self, AllocKind};
use std::os::raw::{c_int, c_uint};
use std::ptr;

#[repr(C)]
#[derive(Debug)]
pub struct GList {
    pub data: gpointer,
    pub next: *mut GList,
    pub prev: *mut GList,
}

fn new_node(data: gpointer) -> *mut GList {
    let node = Box::into_raw(Box::new(GList {
        data,
        next: ptr::null_mut(),
        prev: ptr::null_mut(),
    }));
    ledger::register(node as usize, AllocKind::ListNode);
    node
}

unsafe fn free_node(node: *mut GList) {
    if ledger::release(node as usize, AllocKind::ListNode) {
        drop(Box::from_raw(node));
    }
}

#[no_mangle]
pub unsafe extern "C" fn g_list_last(list: *mut GList) -> *mut GList {
    let mut node = list;
    if node.is_null() {
        return node;
    }
    while !(*node).next.is_null() {
        node = (*node).next;
    }
    node
}

#[no_mangle]
pub unsafe extern "C" fn g_list_append(list: *mut GList, data: gpointer) -> *mut GList {
    let node = new_node(data);
    if list.is_null() {
        return node;
    }
    let last = g_list_last(list);
    (*last).next = node;
    (*node).prev = last;
    list
}

#[no_mangle]
pub unsafe extern "C" fn g_list_prepend(list: *mut GList, data: gpointer) -> *mut GList {
    let node = new_node(data);
    (*node).next = list;
    if !list.is_null() {
        (*list).prev = node;
    }
    node
}

/// Insert `data` before position `position`. Negative or past-the-end
/// positions append.
#[no_mangle]
pub unsafe extern "C" fn g_list_insert(
    list: *mut GList,
    data: gpointer,
    position: c_int,
) -> *mut GList {
    if position < 0 {
        return g_list_append(list, data);
    }
    if position == 0 {
        return g_list_prepend(list, data);
    }
    let at = g_list_nth(list, position as c_uint);
    if at.is_null() {
        return g_list_append(list, data);
    }
    let node = new_node(data);
    let before = (*at).prev;
    (*node).prev = before;
    (*node).next = at;
    (*at).prev = node;
    // position > 0, so `at` is never the head
    (*before).next = node;
    list
}

/// Remove the first node holding `data`. The data itself is untouched.
#[no_mangle]
pub unsafe extern "C" fn g_list_remove(list: *mut GList, data: gpointer) -> *mut GList {
    let node = g_list_find(list, data);
    if node.is_null() {
        return list;
    }
    let mut head = list;
    let prev = (*node).prev;
    let next = (*node).next;
    if prev.is_null() {
        head = next;
    } else {
        (*prev).next = next;
    }
    if !next.is_null() {
        (*next).prev = prev;
    }
    free_node(node);
    head
}

#[no_mangle]
pub unsafe extern "C" fn g_list_find(list: *mut GList, data: gpointer) -> *mut GList {
    let mut node = list;
    while !node.is_null() {
        if (*node).data == data {
            return node;
        }
        node = (*node).next;
    }
    ptr::null_mut()
}

/// Position of `data`, or -1.
#[no_mangle]
pub unsafe extern "C" fn g_list_index(list: *mut GList, data: gpointer) -> c_int {
    let mut node = list;
    let mut i = 0;
    while !node.is_null() {
        if (*node).data == data {
            return i;
        }
        i += 1;
        node = (*node).next;
    }
    -1
}

#[no_mangle]
pub unsafe extern "C" fn g_list_length(list: *mut GList) -> c_uint {
    let mut node = list;
    let mut len = 0;
    while !node.is_null() {
        len += 1;
        node = (*node).next;
    }
    len
}

#[no_mangle]
pub unsafe extern "C" fn g_list_nth(list: *mut GList, n: c_uint) -> *mut GList {
    let mut node = list;
    let mut n = n;
    while n > 0 && !node.is_null() {
        node = (*node).next;
        n -= 1;
    }
    node
}

#[no_mangle]
pub unsafe extern "C" fn g_list_nth_data(list: *mut GList, n: c_uint) -> gpointer {
    let node = g_list_nth(list, n);
    if node.is_null() {
        ptr::null_mut()
    } else {
        (*node).data
    }
}

/// Shallow copy: new nodes, same data.
#[no_mangle]
pub unsafe extern "C" fn g_list_copy(list: *mut GList) -> *mut GList {
    let mut copy = ptr::null_mut();
    let mut node = list;
    while !node.is_null() {
        copy = g_list_append(copy, (*node).data);
        node = (*node).next;
    }
    copy
}

/// Free every node. The data pointers are not touched.
#[no_mangle]
pub unsafe extern "C" fn g_list_free(list: *mut GList) {
    let mut node = list;
    while !node.is_null() {
        let next = (*node).next;
        free_node(node);
        node = next;
    }
}

/// Collect the data pointers into a vector so callers can mutate the list
/// while walking the copy.
pub(crate) unsafe fn to_vec<T>(list: *mut GList) -> Vec<*mut T> {
    let mut out = Vec::new();
    let mut node = list;
    while !node.is_null() {
        out.push((*node).data as *mut T);
        node = (*node).next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(v: usize) -> gpointer {
        v as gpointer
    }

    unsafe fn values(list: *mut GList) -> Vec<usize> {
        to_vec::<u8>(list).into_iter().map(|d| d as usize).collect()
    }

    #[test]
    fn test_insert_positions() {
        unsafe {
            let mut list = ptr::null_mut();
            list = g_list_insert(list, p(1), -1);
            list = g_list_insert(list, p(3), 5);
            list = g_list_insert(list, p(0), 0);
            list = g_list_insert(list, p(2), 2);
            assert_eq!(values(list), vec![0, 1, 2, 3]);
            assert_eq!(g_list_length(list), 4);
            assert_eq!(g_list_nth_data(list, 2) as usize, 2);
            assert!(g_list_nth_data(list, 4).is_null());
            g_list_free(list);
        }
    }

    #[test]
    fn test_remove_head_middle_tail() {
        unsafe {
            let mut list = ptr::null_mut();
            for v in 1..=5 {
                list = g_list_append(list, p(v));
            }
            list = g_list_remove(list, p(1));
            list = g_list_remove(list, p(3));
            list = g_list_remove(list, p(5));
            list = g_list_remove(list, p(42));
            assert_eq!(values(list), vec![2, 4]);
            assert!((*list).prev.is_null());
            assert_eq!(g_list_index(list, p(4)), 1);
            assert_eq!(g_list_index(list, p(3)), -1);
            g_list_free(list);
        }
    }

    #[test]
    fn test_nodes_are_balanced() {
        let before = ledger::live_allocations_of(AllocKind::ListNode);
        unsafe {
            let mut list = ptr::null_mut();
            for v in 0..10 {
                list = g_list_prepend(list, p(v));
            }
            let copy = g_list_copy(list);
            list = g_list_remove(list, p(4));
            g_list_free(list);
            g_list_free(copy);
        }
        assert_eq!(ledger::live_allocations_of(AllocKind::ListNode), before);
    }
}
