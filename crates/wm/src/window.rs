//! Window tree nodes and operations.
//!
//! A window is a shared handle onto a tree node. Parents own their
//! children in insertion order (which is also front-to-back paint
//! order); children keep a non-owning back reference for geometry walks
//! and unlinking. Geometry is stored screen-absolute; the public API
//! speaks parent-relative.
//!
//! Handlers are arbitrary client code invoked synchronously from tree
//! operations and may call back into the manager. Every internal borrow
//! is released before a handler runs, so re-entry during `Created`,
//! `Paint` and `PosChanged` is safe.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use screen::Drawable;

use crate::geom::Rect;
use crate::manager::ManagerShared;
use crate::WmError;

/// Messages delivered to a window's handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The window has been created and linked into the tree.
    Created,

    /// The window is being destroyed; children are already gone.
    Destroyed,

    /// The window must redraw into its backing drawable, synchronously.
    Paint,

    /// Geometry changed; rectangles are parent-relative.
    PosChanged { old: Rect, new: Rect },
}

/// Client-side window logic.
pub trait WindowHandler {
    /// Handle one message. The return value is reserved and currently
    /// unused; implementations return 0.
    fn on_event(&mut self, window: &Window, event: WindowEvent) -> u32;
}

pub(crate) struct Node {
    pub(crate) manager: Weak<ManagerShared>,
    pub(crate) parent: Weak<RefCell<Node>>,

    /// Owned children, insertion order. The last child paints last.
    pub(crate) children: Vec<Window>,

    pub(crate) drawable: Option<Drawable>,

    /// Screen-absolute geometry, clipped to the root at mutation time.
    pub(crate) rect: Rect,

    pub(crate) visible: bool,
    pub(crate) dirty: bool,

    /// Client-assigned id for sibling lookup.
    pub(crate) id: u32,

    /// `None` while a dispatch is in flight or for handler-less windows.
    pub(crate) handler: Option<Box<dyn WindowHandler>>,

    pub(crate) destroyed: bool,
}

/// Shared handle to a window tree node.
#[derive(Clone)]
pub struct Window {
    pub(crate) node: Rc<RefCell<Node>>,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.node.borrow();
        f.debug_struct("Window")
            .field("id", &n.id)
            .field("rect", &n.rect)
            .field("visible", &n.visible)
            .field("dirty", &n.dirty)
            .field("children", &n.children.len())
            .finish()
    }
}

impl Window {
    pub(crate) fn new_root(manager: Weak<ManagerShared>, rect: Rect) -> Window {
        Window {
            node: Rc::new(RefCell::new(Node {
                manager,
                parent: Weak::new(),
                children: Vec::new(),
                drawable: Some(Drawable::new(
                    rect.left,
                    rect.top,
                    rect.width() as u16,
                    rect.height() as u16,
                )),
                rect,
                visible: true,
                dirty: false,
                id: 0,
                handler: None,
                destroyed: false,
            })),
        }
    }

    /// Identity comparison of handles.
    pub fn ptr_eq(&self, other: &Window) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    pub fn id(&self) -> u32 {
        self.node.borrow().id
    }

    pub fn is_visible(&self) -> bool {
        self.node.borrow().visible
    }

    pub fn is_dirty(&self) -> bool {
        self.node.borrow().dirty
    }

    pub fn is_destroyed(&self) -> bool {
        self.node.borrow().destroyed
    }

    pub fn is_leaf(&self) -> bool {
        self.node.borrow().children.is_empty()
    }

    /// Immediate children, insertion order.
    pub fn children(&self) -> Vec<Window> {
        self.node.borrow().children.clone()
    }

    pub fn parent(&self) -> Option<Window> {
        self.node
            .borrow()
            .parent
            .upgrade()
            .map(|node| Window { node })
    }

    /// Geometry relative to the parent (screen-absolute for the root).
    pub fn rect(&self) -> Rect {
        let screen_rect = self.node.borrow().rect;
        let (px, py) = self.parent_origin();
        screen_rect.offset(-px, -py)
    }

    /// Screen-absolute geometry.
    pub fn screen_rect(&self) -> Rect {
        self.node.borrow().rect
    }

    /// Borrow the backing drawable for drawing.
    ///
    /// The closure must not call back into operations on this same
    /// window; it holds the node borrow.
    pub fn with_drawable<R>(&self, f: impl FnOnce(&mut Drawable) -> R) -> Result<R, WmError> {
        let mut n = self.node.borrow_mut();
        if n.destroyed {
            return Err(WmError::WindowDestroyed);
        }
        match n.drawable.as_mut() {
            Some(d) => Ok(f(d)),
            None => Err(WmError::NoDrawable),
        }
    }

    /// Swap the handler, returning the previous one. Swapping from
    /// inside a dispatch returns `None` (the old handler is running).
    pub fn set_handler(&self, handler: Box<dyn WindowHandler>) -> Option<Box<dyn WindowHandler>> {
        self.node.borrow_mut().handler.replace(handler)
    }

    /// Linear search of immediate children by client id; no recursion.
    pub fn find_child(&self, id: u32) -> Option<Window> {
        self.node
            .borrow()
            .children
            .iter()
            .find(|c| c.node.borrow().id == id)
            .cloned()
    }

    /// Create a child window.
    ///
    /// `rect` is parent-relative. The stored geometry is clipped to the
    /// root rectangle; the backing drawable keeps the requested size at
    /// the requested screen position. The handler receives `Created`
    /// before the initial invalidation.
    pub fn create_child(
        &self,
        rect: Rect,
        handler: Box<dyn WindowHandler>,
        id: u32,
    ) -> Result<Window, WmError> {
        let (manager, root_rect) = {
            let n = self.node.borrow();
            if n.destroyed {
                return Err(WmError::WindowDestroyed);
            }
            let mgr = n.manager.upgrade().ok_or(WmError::NotInitialized)?;
            let root = mgr.root_window().ok_or(WmError::NotInitialized)?;
            let root_rect = root.node.borrow().rect;
            (n.manager.clone(), root_rect)
        };

        let (px, py) = {
            let n = self.node.borrow();
            (n.rect.left, n.rect.top)
        };
        let abs = rect.offset(px, py);
        let clipped = abs.intersect(root_rect);

        // Drawable reflects the original request, stored rect the clip.
        let drawable = Drawable::new(
            abs.left,
            abs.top,
            abs.width() as u16,
            abs.height() as u16,
        );

        let child = Window {
            node: Rc::new(RefCell::new(Node {
                manager,
                parent: Rc::downgrade(&self.node),
                children: Vec::new(),
                drawable: Some(drawable),
                rect: clipped,
                visible: true,
                dirty: false,
                id,
                handler: Some(handler),
                destroyed: false,
            })),
        };

        self.node.borrow_mut().children.push(child.clone());
        tracing::debug!(id, rect = ?clipped, "window created");

        child.dispatch(WindowEvent::Created);
        child.invalidate();
        Ok(child)
    }

    /// Destroy this window and its subtree, post-order.
    ///
    /// Children go first, then the handler sees `Destroyed`, then the
    /// node is unlinked and its drawable freed. Siblings are not
    /// invalidated.
    pub fn destroy(&self) -> Result<(), WmError> {
        if self.node.borrow().destroyed {
            return Err(WmError::WindowDestroyed);
        }

        loop {
            let child = self.node.borrow().children.first().cloned();
            match child {
                Some(c) => c.destroy()?,
                None => break,
            }
        }

        self.dispatch(WindowEvent::Destroyed);

        let parent = self.node.borrow().parent.upgrade();
        if let Some(parent) = parent {
            parent
                .borrow_mut()
                .children
                .retain(|c| !Rc::ptr_eq(&c.node, &self.node));
        }

        let mut n = self.node.borrow_mut();
        tracing::debug!(id = n.id, "window destroyed");
        n.drawable = None;
        n.handler = None;
        n.children.clear();
        n.dirty = false;
        n.destroyed = true;
        Ok(())
    }

    /// Show or hide the window.
    ///
    /// Showing invalidates the window itself; hiding invalidates the
    /// parent's full rectangle so whatever is revealed repaints.
    pub fn set_visible(&self, visible: bool) -> Result<(), WmError> {
        {
            let mut n = self.node.borrow_mut();
            if n.destroyed {
                return Err(WmError::WindowDestroyed);
            }
            n.visible = visible;
            if !visible {
                // A hidden leaf can never satisfy a paint request.
                n.dirty = false;
            }
        }

        if visible {
            self.invalidate();
        } else {
            match self.parent() {
                Some(parent) => parent.invalidate(),
                None => self.invalidate(),
            }
        }
        Ok(())
    }

    /// Move/resize the window. `rect` is parent-relative.
    ///
    /// A no-op (same geometry) emits no message. The stored rectangle
    /// is clamped to the root; the drawable is taken through a
    /// shrink-move-grow sequence so no intermediate step leaves it
    /// hanging past the screen edge. On failure the steps already
    /// committed are not rolled back.
    pub fn set_pos(&self, rect: Rect) -> Result<(), WmError> {
        let manager = {
            let n = self.node.borrow();
            if n.destroyed {
                return Err(WmError::WindowDestroyed);
            }
            n.manager.upgrade().ok_or(WmError::NotInitialized)?
        };

        let parent = self.parent();
        let (px, py) = self.parent_origin();
        let abs = rect.offset(px, py);
        let old = self.node.borrow().rect;
        if abs == old {
            return Ok(());
        }

        let new = match parent {
            Some(_) => {
                let root = manager.root_window().ok_or(WmError::NotInitialized)?;
                let root_rect = root.node.borrow().rect;
                abs.intersect(root_rect)
            }
            None => abs,
        };

        {
            let mut n = self.node.borrow_mut();
            if let Some(d) = n.drawable.as_mut() {
                let screen = manager.screen.borrow();
                let (screen_cols, screen_rows) = screen.size();
                let (ox, oy) = d.origin();

                let target_cols = new.width().max(1);
                let target_rows = new.height().max(1);
                let fit_cols = target_cols.min((screen_cols as i32 - ox).max(1));
                let fit_rows = target_rows.min((screen_rows as i32 - oy).max(1));

                screen.resize_drawable(d, fit_cols as u16, fit_rows as u16)?;
                screen.move_drawable(d, new.left, new.top)?;
                screen.resize_drawable(d, target_cols as u16, target_rows as u16)?;
            }
            n.rect = new;
        }

        let damage = old.union(new);
        match self.parent() {
            Some(parent) => parent.invalidate_rect(damage),
            None => self.invalidate_rect(damage),
        }

        tracing::debug!(id = self.id(), from = ?old, to = ?new, "window moved");
        self.dispatch(WindowEvent::PosChanged {
            old: old.offset(-px, -py),
            new: new.offset(-px, -py),
        });
        Ok(())
    }

    /// Mark the window's visible area as needing repaint.
    ///
    /// The rectangle is clipped through every ancestor; if an ancestor
    /// is invisible or the clip comes up empty, nothing happens.
    pub fn invalidate(&self) {
        let (mut rect, mut parent) = {
            let n = self.node.borrow();
            if n.destroyed {
                return;
            }
            (n.rect, n.parent.upgrade())
        };

        while let Some(p) = parent {
            let pn = p.borrow();
            if !pn.visible {
                return;
            }
            rect = rect.intersect(pn.rect);
            if rect.is_empty() {
                return;
            }
            parent = pn.parent.upgrade();
        }

        self.invalidate_rect(rect);
    }

    /// Mark the part of the subtree covered by `rect` as dirty.
    ///
    /// Recursive descent: non-leaf windows forward the clipped
    /// rectangle to their children and are never dirtied themselves;
    /// visible leaves set their dirty flag and arm the idle hook.
    pub fn invalidate_rect(&self, rect: Rect) {
        let descend = {
            let n = self.node.borrow();
            if n.destroyed || !n.visible {
                return;
            }
            let clipped = rect.intersect(n.rect);
            if clipped.is_empty() {
                return;
            }
            if n.children.is_empty() {
                None
            } else {
                Some((n.children.clone(), clipped))
            }
        };

        match descend {
            Some((children, clipped)) => {
                for child in children {
                    child.invalidate_rect(clipped);
                }
            }
            None => {
                let manager = {
                    let mut n = self.node.borrow_mut();
                    n.dirty = true;
                    n.manager.upgrade()
                };
                if let Some(manager) = manager {
                    manager.mark_dirty();
                }
            }
        }
    }

    /// Invoke the handler with all internal borrows released.
    pub(crate) fn dispatch(&self, event: WindowEvent) -> u32 {
        let mut handler = self.node.borrow_mut().handler.take();
        let ret = match handler.as_mut() {
            Some(h) => h.on_event(self, event),
            None => 0,
        };
        let mut n = self.node.borrow_mut();
        // A re-entrant set_handler during dispatch wins over put-back.
        if n.handler.is_none() && !n.destroyed {
            n.handler = handler;
        }
        ret
    }

    fn parent_origin(&self) -> (i32, i32) {
        match self.node.borrow().parent.upgrade() {
            Some(p) => {
                let pn = p.borrow();
                (pn.rect.left, pn.rect.top)
            }
            None => (0, 0),
        }
    }
}
