use std::collections::BTreeSet;
use std::net::IpAddr;

use kea_config_core::{DhcpFamily, OptionData, Pool, Subnet};
use pretty_assertions::assert_eq;

use super::{assemble_subnets, build_subnet, build_subnets, pool_range, SubnetOptions};
use crate::discovery::ServerRecord;
use crate::error::ErrorKind;
use crate::inventory::{
    Association, IpAddress, Prefix, Protocol, Relationship, ServiceBinding, Snapshot,
};
use crate::prefix::ResolvedPrefix;

fn resolved(cidr: &str, pools: &[&str]) -> ResolvedPrefix {
    let net: ipnetwork::IpNetwork = cidr.parse().expect("cidr");
    ResolvedPrefix {
        family: match net {
            ipnetwork::IpNetwork::V4(_) => DhcpFamily::Dhcp4,
            ipnetwork::IpNetwork::V6(_) => DhcpFamily::Dhcp6,
        },
        network: net.network(),
        prefix_len: net.prefix(),
        gateways: Vec::new(),
        dns_servers: Vec::new(),
        ntp_servers: Vec::new(),
        pools: pools.iter().map(|p| p.parse().expect("pool")).collect(),
    }
}

fn addrs(raw: &[&str]) -> Vec<IpAddr> {
    raw.iter().map(|a| a.parse().expect("ip")).collect()
}

fn server(service_id: &str) -> ServerRecord {
    ServerRecord {
        device: "dhcp1".to_string(),
        interfaces: BTreeSet::from(["eth0".to_string()]),
        service: ServiceBinding {
            id: service_id.to_string(),
            name: "dhcp".to_string(),
            device: "dhcp1".to_string(),
            protocol: Protocol::Udp,
            ports: vec![67],
            ip_addresses: vec!["ip-1".to_string()],
        },
    }
}

fn prefix(id: &str, cidr: &str, role: Option<&str>, parent: Option<&str>) -> Prefix {
    Prefix {
        id: id.to_string(),
        prefix: cidr.parse().expect("cidr"),
        role: role.map(str::to_string),
        parent: parent.map(str::to_string),
    }
}

fn edge(relationship: Relationship, source: &str, destination: &str) -> Association {
    Association {
        relationship,
        source: source.to_string(),
        destination: destination.to_string(),
    }
}

#[test]
fn pool_range_excludes_network_and_broadcast() {
    assert_eq!(pool_range("10.0.0.0/24".parse().expect("cidr")), "10.0.0.1 - 10.0.0.254");
    assert_eq!(pool_range("10.0.0.0/28".parse().expect("cidr")), "10.0.0.1 - 10.0.0.14");
    assert_eq!(
        pool_range("2001:db8::/120".parse().expect("cidr")),
        "2001:db8::1 - 2001:db8::fe"
    );
}

#[test]
fn pool_range_masks_host_bits_of_pool_prefix() {
    assert_eq!(pool_range("10.0.0.77/26".parse().expect("cidr")), "10.0.0.65 - 10.0.0.126");
}

#[test]
fn tiny_pools_degrade_without_panicking() {
    assert_eq!(pool_range("10.0.0.4/31".parse().expect("cidr")), "10.0.0.5 - 10.0.0.4");
    assert_eq!(pool_range("10.0.0.4/32".parse().expect("cidr")), "10.0.0.5 - 10.0.0.3");
    assert_eq!(
        pool_range("255.255.255.255/32".parse().expect("cidr")),
        "0.0.0.0 - 255.255.255.254"
    );
    assert_eq!(
        pool_range("::/128".parse().expect("cidr")),
        "::1 - ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff"
    );
}

#[test]
fn empty_address_lists_omit_their_options() {
    let mut prefix = resolved("10.0.0.0/24", &["10.0.0.0/28"]);
    assert!(SubnetOptions::from_resolved(&prefix)
        .into_option_data()
        .is_empty());

    prefix.ntp_servers = addrs(&["10.0.0.123", "10.0.0.124"]);
    let options = SubnetOptions::from_resolved(&prefix).into_option_data();
    assert_eq!(options, vec![OptionData::new("ntp-servers", "10.0.0.123,10.0.0.124")]);
}

#[test]
fn all_options_are_emitted_in_fixed_order() {
    let mut prefix = resolved("10.0.0.0/24", &["10.0.0.0/28"]);
    prefix.gateways = addrs(&["10.0.0.254"]);
    prefix.dns_servers = addrs(&["10.0.0.53", "10.0.0.54"]);
    prefix.ntp_servers = addrs(&["10.0.0.123"]);

    let subnet = build_subnet(4, &prefix).expect("subnet");
    assert_eq!(
        subnet.option_data,
        vec![
            OptionData::new("domain-name-servers", "10.0.0.53,10.0.0.54"),
            OptionData::new("ntp-servers", "10.0.0.123"),
            OptionData::new("routers", "10.0.0.254"),
        ]
    );
}

#[test]
fn dhcp6_subnets_carry_the_same_option_names() {
    let mut prefix = resolved("2001:db8:1::/64", &["2001:db8:1::/112"]);
    prefix.gateways = addrs(&["2001:db8:1::1"]);
    prefix.dns_servers = addrs(&["2001:db8:1::53"]);
    prefix.ntp_servers = addrs(&["2001:db8:1::123"]);

    let subnet = build_subnet(1, &prefix).expect("subnet");
    assert_eq!(
        subnet.option_data,
        vec![
            OptionData::new("domain-name-servers", "2001:db8:1::53"),
            OptionData::new("ntp-servers", "2001:db8:1::123"),
            OptionData::new("routers", "2001:db8:1::1"),
        ]
    );
    assert_eq!(
        subnet.pools,
        vec![Pool::new("2001:db8:1::1 - 2001:db8:1::fffe")]
    );
}

#[test]
fn ids_are_shared_across_families_and_skip_poolless_prefixes() {
    let prefixes = vec![
        resolved("10.0.0.0/24", &["10.0.0.0/28"]),
        resolved("2001:db8::/64", &["2001:db8::/120"]),
        resolved("10.1.0.0/24", &[]),
        resolved("10.2.0.0/24", &["10.2.0.0/25", "10.2.0.128/25"]),
        resolved("2001:db8:2::/64", &[]),
    ];

    let subnets = assemble_subnets(&prefixes);

    let v4: Vec<(u32, &str)> = subnets
        .dhcp4
        .iter()
        .map(|s| (s.id, s.subnet.as_str()))
        .collect();
    let v6: Vec<(u32, &str)> = subnets
        .dhcp6
        .iter()
        .map(|s| (s.id, s.subnet.as_str()))
        .collect();
    assert_eq!(v4, vec![(1, "10.0.0.0/24"), (4, "10.2.0.0/24")]);
    assert_eq!(v6, vec![(2, "2001:db8::/64")]);
    assert_eq!(
        subnets.dhcp4[1].pools,
        vec![
            Pool::new("10.2.0.1 - 10.2.0.126"),
            Pool::new("10.2.0.129 - 10.2.0.254"),
        ]
    );
    assert!(subnets.for_family(DhcpFamily::Dhcp6).iter().all(|s| s.id != 5));
}

#[test]
fn builds_subnets_from_inventory_end_to_end() {
    let snapshot = Snapshot {
        ip_addresses: vec![IpAddress {
            id: "dns-1".to_string(),
            address: "10.0.0.53/24".parse().expect("address"),
        }],
        prefixes: vec![
            prefix("net", "10.0.0.0/24", None, None),
            prefix("pool", "10.0.0.0/28", Some("dhcp-pool"), Some("net")),
        ],
        associations: vec![
            edge(Relationship::ServerToSubnet, "svc-1", "net"),
            edge(Relationship::DnsToSubnet, "dns-1", "net"),
        ],
        ..Snapshot::default()
    };

    let subnets = build_subnets(&snapshot, &server("svc-1")).expect("build");

    assert_eq!(
        subnets.dhcp4,
        vec![Subnet::new(
            1,
            "10.0.0.0/24",
            vec![OptionData::new("domain-name-servers", "10.0.0.53")],
            vec![Pool::new("10.0.0.1 - 10.0.0.14")],
        )]
    );
    assert!(subnets.dhcp6.is_empty());
}

#[test]
fn dangling_subnet_association_is_not_found() {
    let snapshot = Snapshot {
        associations: vec![edge(Relationship::ServerToSubnet, "svc-1", "missing")],
        ..Snapshot::default()
    };

    let err = build_subnets(&snapshot, &server("svc-1")).expect_err("should fail");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "prefix not found: missing");
}
