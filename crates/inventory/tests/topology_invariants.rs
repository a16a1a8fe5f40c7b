use kubeauto_inventory::{Inventory, InventoryError, Role};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Etcd), Just(Role::Master), Just(Role::Worker)]
}

fn members_strategy() -> impl Strategy<Value = BTreeSet<u8>> {
    prop::collection::btree_set(1u8..60, 0..6)
}

fn render_doc(etcd: &BTreeSet<u8>, master: &BTreeSet<u8>, worker: &BTreeSet<u8>) -> Inventory {
    let mut text = String::from("# generated\n[etcd]\n");
    for host in etcd {
        text.push_str(&format!("10.0.1.{host}\n"));
    }
    text.push_str("\n[kube_master]\n");
    for host in master {
        text.push_str(&format!("10.0.1.{host} k8s_nodename='m-{host}'\n"));
    }
    text.push_str("# trailing note\n\n[kube_node]\n");
    for host in worker {
        text.push_str(&format!("10.0.1.{host}\n"));
    }
    text.push_str("\n[all:vars]\nCLUSTER_NETWORK=\"calico\"\n");
    Inventory::parse(&text)
}

fn lines_starting_with(doc: &Inventory, role: Role, ip: &str) -> usize {
    doc.section_lines(role)
        .unwrap()
        .iter()
        .filter(|line| line.split_whitespace().next() == Some(ip))
        .count()
}

fn section_contents(doc: &Inventory, role: Role) -> Vec<String> {
    doc.section_lines(role)
        .unwrap()
        .iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

proptest! {
    #[test]
    fn insert_yields_exactly_one_member_line(
        etcd in members_strategy(),
        master in members_strategy(),
        worker in members_strategy(),
        role in role_strategy(),
        host in 100u8..200,
    ) {
        let mut doc = render_doc(&etcd, &master, &worker);
        let ip = format!("10.0.1.{host}");

        doc.insert(role, &format!("{ip} extra=1")).unwrap();
        prop_assert_eq!(lines_starting_with(&doc, role, &ip), 1);

        let snapshot = doc.render();
        let err = doc.insert(role, &ip).unwrap_err();
        prop_assert!(
            matches!(err, InventoryError::NodeExists { .. }),
            "unexpected error: {err}"
        );
        prop_assert_eq!(doc.render(), snapshot);
    }

    #[test]
    fn remove_undoes_insert(
        etcd in members_strategy(),
        master in members_strategy(),
        worker in members_strategy(),
        role in role_strategy(),
        host in 100u8..200,
    ) {
        let original = render_doc(&etcd, &master, &worker);
        let ip = format!("10.0.1.{host}");

        let mut doc = original.clone();
        doc.insert(role, &format!("{ip} extra=1")).unwrap();
        let removed = doc.remove(role, &ip).unwrap();

        prop_assert_eq!(removed, 1);
        for section in Role::ALL {
            prop_assert_eq!(section_contents(&doc, section), section_contents(&original, section));
        }
        prop_assert_eq!(doc.render(), original.render());
    }

    #[test]
    fn remove_of_absent_ip_leaves_document_unchanged(
        etcd in members_strategy(),
        master in members_strategy(),
        worker in members_strategy(),
        role in role_strategy(),
        host in 100u8..200,
    ) {
        let mut doc = render_doc(&etcd, &master, &worker);
        let snapshot = doc.clone();

        let err = doc.remove(role, &format!("10.0.1.{host}")).unwrap_err();
        prop_assert!(
            matches!(err, InventoryError::NodeNotFound { .. }),
            "unexpected error: {err}"
        );
        prop_assert_eq!(doc, snapshot);
    }

    #[test]
    fn member_lookup_ignores_other_sections(
        etcd in members_strategy(),
        worker in members_strategy(),
        sentinel in 100u8..200,
    ) {
        let mut only_in_etcd = etcd.clone();
        only_in_etcd.insert(sentinel);
        let doc = render_doc(&only_in_etcd, &BTreeSet::new(), &worker);
        let ip = format!("10.0.1.{sentinel}");

        prop_assert!(doc.member_exists(Role::Etcd, &ip));
        prop_assert!(!doc.member_exists(Role::Master, &ip));
        prop_assert!(!doc.member_exists(Role::Worker, &ip));
    }
}

#[test]
fn removal_drops_every_line_naming_the_ip() {
    let mut doc = Inventory::parse(
        "[etcd]\n10.0.0.1\n[kube_master]\n10.0.0.5 a=1\n10.0.0.6\n10.0.0.5 b=2\n[kube_node]\n10.0.0.5\n",
    );

    assert_eq!(doc.remove(Role::Master, "10.0.0.5").unwrap(), 2);
    assert_eq!(section_contents(&doc, Role::Master), vec!["10.0.0.6"]);
    assert_eq!(section_contents(&doc, Role::Worker), vec!["10.0.0.5"]);
}
