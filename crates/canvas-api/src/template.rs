//! Starter template for new page templates.

use crate::node::{MenuData, SlotData};
use crate::{CanvasSettings, Document, EngineLimits, Node, NodeKind, Result, TemplateRef};

pub const TOP_MENU_ID: &str = "node_menu_top";
pub const SLOT_ID: &str = "node_slot";
pub const FOOTER_MENU_ID: &str = "node_menu_footer";

const MENU_HEIGHT: f64 = 96.0;
const SLOT_HEIGHT: f64 = 1200.0;
/// Distance from the top of one stacked section to the next
const MENU_ADVANCE: f64 = 120.0;
const SLOT_ADVANCE: f64 = 1240.0;
const SLOT_NAME: &str = "Page content";

impl Document {
    /// A template with an optional top menu, the page slot and an optional
    /// footer menu, stacked at full width on every breakpoint.
    ///
    /// A blank menu name or `none` leaves that menu out; the slot moves up
    /// to take its place.
    pub fn default_template(menu: &str, footer: &str) -> Result<Document> {
        let canvas = CanvasSettings::default();
        let mut nodes = Vec::new();
        let mut y = 0.0;

        if let Some(menu) = menu_name(menu) {
            nodes.push(menu_node(TOP_MENU_ID, menu, "top", &canvas, y));
            y += MENU_ADVANCE;
        }

        let slot = NodeKind::Slot(SlotData {
            name: Some(SLOT_NAME.to_string()),
            ..Default::default()
        });
        let frames = Node::default_frames(&canvas.widths, y, SLOT_HEIGHT);
        nodes.push(Node::new(SLOT_ID, slot, frames.desktop).with_frames(frames));
        y += SLOT_ADVANCE;

        if let Some(footer) = menu_name(footer) {
            nodes.push(menu_node(FOOTER_MENU_ID, footer, "footer", &canvas, y));
        }

        Document::from_nodes(nodes, canvas, TemplateRef::default(), &EngineLimits::default())
    }
}

fn menu_name(raw: &str) -> Option<&str> {
    let name = raw.trim();
    (!name.is_empty() && !name.eq_ignore_ascii_case("none")).then_some(name)
}

fn menu_node(id: &str, menu: &str, kind: &str, canvas: &CanvasSettings, y: f64) -> Node {
    let data = NodeKind::Menu(MenuData {
        menu: Some(menu.to_string()),
        kind: Some(kind.to_string()),
        ..Default::default()
    });
    let frames = Node::default_frames(&canvas.widths, y, MENU_HEIGHT);
    Node::new(id, data, frames.desktop).with_frames(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Breakpoint;

    fn ys(doc: &Document) -> Vec<(&str, f64)> {
        doc.nodes()
            .iter()
            .map(|n| (n.id.as_str(), n.frame(Breakpoint::Mobile).y))
            .collect()
    }

    #[test]
    fn test_menus_wrap_the_slot() {
        let doc = Document::default_template(" main ", "footer").unwrap();
        assert_eq!(
            ys(&doc),
            vec![(TOP_MENU_ID, 0.0), (SLOT_ID, 120.0), (FOOTER_MENU_ID, 1360.0)]
        );

        let top = doc.find(TOP_MENU_ID).unwrap();
        assert_eq!(top.frame(Breakpoint::Tablet).w, 820.0);
        assert_eq!(top.frame(Breakpoint::Desktop).h, 96.0);
        match &top.kind {
            NodeKind::Menu(data) => {
                assert_eq!(data.menu.as_deref(), Some("main"));
                assert_eq!(data.kind.as_deref(), Some("top"));
            }
            other => panic!("expected menu, got {:?}", other),
        }
        assert_eq!(doc.find(SLOT_ID).unwrap().label(), "Page content");
        assert_eq!(doc.find(SLOT_ID).unwrap().frame(Breakpoint::Desktop).h, 1200.0);
    }

    #[test]
    fn test_blank_or_none_menus_are_left_out() {
        let doc = Document::default_template("None", "").unwrap();
        assert_eq!(ys(&doc), vec![(SLOT_ID, 0.0)]);

        let doc = Document::default_template("", "site-footer").unwrap();
        assert_eq!(ys(&doc), vec![(SLOT_ID, 0.0), (FOOTER_MENU_ID, 1240.0)]);
    }
}
