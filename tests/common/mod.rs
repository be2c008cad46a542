//! Shared fixtures for integration tests

#![allow(dead_code)]

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::x509::{X509, X509NameBuilder};

use afip_creds::credentials::{KeyMaterialGenerator, KeyPair};

/// A freshly generated key pair plus a self-signed certificate for it, both
/// as PEM.
pub struct TestCredentials {
    pub key: KeyPair,
    pub key_pem: Vec<u8>,
    pub cert_pem: Vec<u8>,
}

pub fn credentials(common_name: &str) -> TestCredentials {
    let key = KeyMaterialGenerator::generate().unwrap();
    let key_pem = KeyMaterialGenerator::serialize(&key).unwrap();
    let cert_pem = self_signed(&key, common_name).to_pem().unwrap();
    TestCredentials {
        key,
        key_pem,
        cert_pem,
    }
}

pub fn self_signed(key: &KeyPair, common_name: &str) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, "Acme").unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, common_name).unwrap();
    let name = name.build();

    let mut serial = BigNum::new().unwrap();
    serial.rand(64, MsbOption::MAYBE_ZERO, false).unwrap();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder
        .set_serial_number(&serial.to_asn1_integer().unwrap())
        .unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder.set_pubkey(key.private_key()).unwrap();
    builder
        .sign(key.private_key(), MessageDigest::sha256())
        .unwrap();
    builder.build()
}

/// Rewrite the BEGIN/END labels of a PEM document.
pub fn relabel(pem: &[u8], from: &str, to: &str) -> Vec<u8> {
    String::from_utf8(pem.to_vec())
        .unwrap()
        .replace(&format!("-----BEGIN {from}-----"), &format!("-----BEGIN {to}-----"))
        .replace(&format!("-----END {from}-----"), &format!("-----END {to}-----"))
        .into_bytes()
}

/// A login ticket request as the gateway expects it.
pub fn ticket_request(service: &str) -> Vec<u8> {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <loginTicketRequest version=\"1.0\"><header><uniqueId>1700000000</uniqueId>\
         <generationTime>2026-10-15T10:00:00-03:00</generationTime>\
         <expirationTime>2026-10-15T10:20:00-03:00</expirationTime></header>\
         <service>{service}</service></loginTicketRequest>"
    )
    .into_bytes()
}
