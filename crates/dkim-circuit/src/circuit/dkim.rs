use composer::{
    ark_bn254::Fr,
    ark_ff::Zero,
    bits::{num_to_bits, ByteVar},
    sha256::{sha256_collect_8_outputs_to_field, sha256_fixed_length, sha256_state_to_bytes},
    Composer,
};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use crate::{
    circuit::{
        base64::base64_encode_gadget,
        dynamic_hash::{sha256_padded_slice, sha256_windowed},
        padded_slice::{concat, PaddedSliceVar},
        rsa::{verify_pkcs1v15_sha256, BigUintVar},
    },
    parameters::CircuitParameters,
    utils::{digest_to_field, left_pad, strip_leading_zeros},
    witness::DkimWitness,
    CircuitResult,
};

/// `N ∥ E ∥ body hash ∥ sha256(specify)` with N and E left-padded to
/// `bindingKeyBytes`
pub fn binding_digest(
    modulus: &[u8],
    exponent: &[u8],
    body_hash: &[u8],
    specify: &[u8],
    params: &CircuitParameters,
) -> CircuitResult<Vec<u8>> {
    let width = params.binding_key_bytes;
    let mut message = left_pad(strip_leading_zeros(modulus), width, "modulus")?;
    message.extend(left_pad(strip_leading_zeros(exponent), width, "exponent")?);
    message.extend_from_slice(body_hash);
    message.extend(Sha256::digest(specify));

    Ok(Sha256::digest(&message).to_vec())
}

/// The public input a verifier expects for a claimed key, body hash and
/// distinguished header (canonical form, with its CRLF).
pub fn binding_public_input(
    modulus: &[u8],
    exponent: &[u8],
    body_hash: &[u8],
    specify: &[u8],
    params: &CircuitParameters,
) -> CircuitResult<Fr> {
    let digest = binding_digest(modulus, exponent, body_hash, specify, params)?;
    Ok(digest_to_field(&digest))
}

pub struct DkimCircuit {
    pub witness: DkimWitness,
    pub params: CircuitParameters,
}

impl DkimCircuit {
    pub fn new(witness: DkimWitness, params: CircuitParameters) -> CircuitResult<Self> {
        params.validate()?;
        witness.check_shape(&params)?;

        Ok(Self { witness, params })
    }

    pub fn synthesize(&self) -> CircuitResult<Composer<Fr>> {
        // new '5 column' circuit
        let mut cs = Composer::new(5);
        let witness = &self.witness;
        let params = &self.params;

        // header regions
        let prefix = PaddedSliceVar::alloc(&mut cs, &witness.prefix);
        let specify = PaddedSliceVar::alloc(&mut cs, &witness.specify);
        let suffix = PaddedSliceVar::alloc(&mut cs, &witness.suffix);
        let sig_prefix = PaddedSliceVar::alloc(&mut cs, &witness.sig_prefix);
        let sig_suffix = PaddedSliceVar::alloc(&mut cs, &witness.sig_suffix);

        // the distinguished header is one whole signed field: the prefix stops at
        // a field boundary and the specify region is a single `name:...\r\n`
        prefix.enforce_ends_with(&mut cs, b'\n', true);
        specify.enforce_field_name(&mut cs, params.distinguished_header.name());
        specify.enforce_ends_with(&mut cs, b'\n', false);

        // bh= is rebuilt from the body hash bytes the binding hash covers
        let body_hash: Vec<_> = witness
            .body_hash
            .iter()
            .map(|b| ByteVar::alloc(&mut cs, *b))
            .collect();
        let body_hash_b64 = base64_encode_gadget(&mut cs, &body_hash)?;
        let body_hash_b64 = PaddedSliceVar::full(&mut cs, body_hash_b64);

        let trimmed = concat(&mut cs, &sig_prefix, &body_hash_b64);
        let trimmed = concat(&mut cs, &trimmed, &sig_suffix);

        let header = concat(&mut cs, &prefix, &specify);
        let header = concat(&mut cs, &header, &suffix);
        let header = concat(&mut cs, &header, &trimmed);
        log::debug!(
            "header slice of {} bytes, {} gates so far",
            header.capacity(),
            cs.size()
        );

        let header_hash = sha256_padded_slice(&mut cs, &header, params.header_hash_strategy);
        let header_hash = sha256_state_to_bytes(&mut cs, &header_hash);
        let header_hash: Vec<_> = header_hash.iter().map(|b| b.var).collect();
        log::debug!(
            "{:?} header hash done, {} gates so far",
            params.header_hash_strategy,
            cs.size()
        );

        // public key
        let modulus: Vec<_> = witness
            .modulus
            .iter()
            .map(|b| ByteVar::alloc(&mut cs, *b))
            .collect();
        let modulus_vars: Vec<_> = modulus.iter().map(|b| b.var).collect();
        let modulus_limbs = BigUintVar::from_be_bytes(&mut cs, &modulus_vars);

        let exponent: Vec<_> = witness
            .exponent
            .iter()
            .map(|b| ByteVar::alloc(&mut cs, *b))
            .collect();
        let exponent_terms: Vec<_> = exponent
            .iter()
            .rev()
            .enumerate()
            .map(|(i, b)| (b.var, Fr::from(1u64 << (8 * i))))
            .collect();
        let exponent_var = cs.linear_combination(&exponent_terms, Fr::zero());
        let exponent_bits = num_to_bits(&mut cs, exponent_var, params.exponent_bits);

        let signature = BigUintVar::alloc(
            &mut cs,
            &BigUint::from_bytes_be(&witness.signature),
            modulus_limbs.num_limbs(),
        );
        verify_pkcs1v15_sha256(
            &mut cs,
            &signature,
            &exponent_bits,
            &modulus_limbs,
            &header_hash,
        )?;
        log::debug!("rsa done, {} gates so far", cs.size());

        // binding hash
        let specify_hash = sha256_windowed(&mut cs, &specify.bytes, &specify.starts);
        let specify_hash = sha256_state_to_bytes(&mut cs, &specify_hash);

        let width = params.binding_key_bytes;
        let mut message = vec![ByteVar::zero::<Fr>(); width - modulus.len()];
        message.extend_from_slice(&modulus);
        message.resize(2 * width - exponent.len(), ByteVar::zero::<Fr>());
        message.extend_from_slice(&exponent);
        message.extend_from_slice(&body_hash);
        message.extend_from_slice(&specify_hash);

        let binding = sha256_fixed_length(&mut cs, &message);
        let binding = sha256_collect_8_outputs_to_field(&mut cs, &binding);

        let public_input = cs.alloc_input(witness.public_input());
        cs.enforce_eq(public_input, binding);

        log::debug!(
            "synthesized {} gates, {} variables",
            cs.size(),
            cs.num_variables()
        );

        Ok(cs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        parameters::{DistinguishedHeader, HashStrategy},
        types::PaddedBytes,
    };
    use base64::{engine::general_purpose, Engine as _};
    use rand::{rngs::StdRng, SeedableRng};
    use rsa::{traits::PublicKeyParts, Pkcs1v15Sign, RsaPrivateKey};

    const SIG_PREFIX: &[u8] = b"dkim-signature:v=1; a=rsa-sha256; d=a.b; s=s; h=from:to; bh=";

    fn params() -> CircuitParameters {
        CircuitParameters {
            prefix_capacity: 8,
            specify_capacity: 12,
            suffix_capacity: 12,
            sig_prefix_capacity: 64,
            sig_suffix_capacity: 4,
            rsa_key_bytes: 64,
            binding_key_bytes: 64,
            exponent_bits: 17,
            header_hash_strategy: HashStrategy::Shifted,
            distinguished_header: DistinguishedHeader::From,
            verify_body_hash: false,
        }
    }

    fn signed_witness(params: &CircuitParameters) -> DkimWitness {
        signed_witness_with(params, b"", b"from:a@b\r\n", b"to:c@d\r\n")
    }

    // a witness over the given header regions, signed with a fresh 512-bit key
    fn signed_witness_with(
        params: &CircuitParameters,
        prefix: &[u8],
        specify: &[u8],
        suffix: &[u8],
    ) -> DkimWitness {
        let mut rng = StdRng::seed_from_u64(1);
        let key = RsaPrivateKey::new(&mut rng, 512).unwrap();

        let body_hash = Sha256::digest(b"").to_vec();
        let mut witness = DkimWitness {
            domain: "a.b".into(),
            selector: "s".into(),
            prefix: PaddedBytes::new(prefix, params.prefix_capacity, "prefix").unwrap(),
            specify: PaddedBytes::new(specify, params.specify_capacity, "specify").unwrap(),
            suffix: PaddedBytes::new(suffix, params.suffix_capacity, "suffix").unwrap(),
            sig_prefix: PaddedBytes::new(SIG_PREFIX, params.sig_prefix_capacity, "sig prefix")
                .unwrap(),
            sig_suffix: PaddedBytes::new(b"; b=", params.sig_suffix_capacity, "sig suffix").unwrap(),
            body_hash,
            signature: vec![],
            modulus: key.n().to_bytes_be(),
            exponent: left_pad(&key.e().to_bytes_be(), params.exponent_bytes(), "e").unwrap(),
            header_hash: vec![],
            binding_hash: vec![],
        };

        witness.header_hash = Sha256::digest(witness.header_bytes()).to_vec();
        witness.signature = key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &witness.header_hash)
            .unwrap();
        witness.signature = left_pad(&witness.signature, params.rsa_key_bytes, "s").unwrap();
        witness.binding_hash = binding_digest(
            &witness.modulus,
            &witness.exponent,
            &witness.body_hash,
            witness.specify.real_bytes(),
            params,
        )
        .unwrap();
        witness.verify_native().unwrap();

        witness
    }

    #[test]
    fn test_binding_public_input() {
        let params = params();
        let witness = signed_witness(&params);
        let claimed = binding_public_input(
            &witness.modulus,
            &witness.exponent,
            &witness.body_hash,
            b"from:a@b\r\n",
            &params,
        )
        .unwrap();
        assert_eq!(claimed, witness.public_input());

        let other = binding_public_input(
            &witness.modulus,
            &witness.exponent,
            &witness.body_hash,
            b"from:x@b\r\n",
            &params,
        )
        .unwrap();
        assert_ne!(other, witness.public_input());

        // the leading zero of a short exponent does not matter
        let stripped = binding_public_input(
            &witness.modulus,
            strip_leading_zeros(&witness.exponent),
            &witness.body_hash,
            b"from:a@b\r\n",
            &params,
        )
        .unwrap();
        assert_eq!(stripped, claimed);
        assert_eq!(
            general_purpose::STANDARD.encode(&witness.body_hash),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn test_dkim_circuit() {
        let params = params();
        let witness = signed_witness(&params);
        let public_input = witness.public_input();

        let circuit = DkimCircuit::new(witness, params).unwrap();
        let cs = circuit.synthesize().unwrap();
        println!("dkim circuit: {} gates", cs.size());
        assert!(cs.is_satisfied(), "{:?}", cs.unsatisfied_gates().first());
        assert_eq!(cs.compute_public_input(), vec![public_input]);
    }

    #[test]
    fn test_shape_matches_placeholder() {
        let params = params();
        let real = DkimCircuit::new(signed_witness(&params), params.clone())
            .unwrap()
            .synthesize()
            .unwrap();
        let placeholder = DkimCircuit::new(DkimWitness::placeholder(&params), params)
            .unwrap()
            .synthesize()
            .unwrap();

        assert!(!placeholder.is_satisfied());
        assert_eq!(real.shape_digest(), placeholder.shape_digest());
        assert_eq!(real.size(), placeholder.size());
    }

    #[test]
    fn test_tampered_witness() {
        let params = params();

        // a different distinguished header under the same signature
        let mut witness = signed_witness(&params);
        witness.specify = PaddedBytes::new(b"from:x@b\r\n", 12, "specify").unwrap();
        let cs = DkimCircuit::new(witness, params.clone())
            .unwrap()
            .synthesize()
            .unwrap();
        assert!(!cs.is_satisfied());

        // a public input for another address
        let mut witness = signed_witness(&params);
        witness.binding_hash[31] ^= 1;
        let cs = DkimCircuit::new(witness, params.clone())
            .unwrap()
            .synthesize()
            .unwrap();
        assert!(!cs.is_satisfied());
        assert!(cs.check_satisfied().is_err());

        // bytes hidden in the padding of a region
        let mut witness = signed_witness(&params);
        witness.prefix.bytes[0] = b'x';
        let cs = DkimCircuit::new(witness, params.clone())
            .unwrap()
            .synthesize()
            .unwrap();
        assert!(!cs.is_satisfied());

        // a body hash the bh= text was not made from
        let mut witness = signed_witness(&params);
        witness.body_hash[0] ^= 1;
        let cs = DkimCircuit::new(witness, params).unwrap().synthesize().unwrap();
        assert!(!cs.is_satisfied());
    }

    #[test]
    fn test_shape_check() {
        let params = params();
        let mut witness = signed_witness(&params);
        witness.modulus.insert(0, 0);
        assert!(DkimCircuit::new(witness, params.clone()).is_err());

        let mut bad = params;
        bad.sig_suffix_capacity = 0;
        assert!(DkimCircuit::new(DkimWitness::placeholder(&bad), bad).is_err());
    }

    #[test]
    fn test_header_boundaries() {
        let mut params = params();
        params.prefix_capacity = 32;
        params.specify_capacity = 16;
        params.suffix_capacity = 32;

        let synthesize = |witness: DkimWitness, params: &CircuitParameters| {
            DkimCircuit::new(witness, params.clone())
                .unwrap()
                .synthesize()
                .unwrap()
        };

        // the real From field of `from:a@b\r\nsubject:hi from:evil@x\r\n`
        let honest = signed_witness_with(
            &params,
            b"",
            b"from:a@b\r\n",
            b"subject:hi from:evil@x\r\n",
        );
        let cs = synthesize(honest, &params);
        assert!(cs.is_satisfied(), "{:?}", cs.unsatisfied_gates().first());

        // the same signed bytes cut inside the subject field
        let cut = signed_witness_with(
            &params,
            b"from:a@b\r\nsubject:hi ",
            b"from:evil@x\r\n",
            b"",
        );
        let cs = synthesize(cut, &params);
        assert!(!cs.is_satisfied());

        // a whole field, but not the distinguished one
        let to = signed_witness_with(&params, b"", b"to:c@d\r\n", b"from:a@b\r\n");
        assert!(!synthesize(to.clone(), &params).is_satisfied());
        params.distinguished_header = DistinguishedHeader::To;
        assert!(synthesize(to, &params).is_satisfied());

        // the distinguished field must end its line
        let open = signed_witness_with(&params, b"", b"to:c@d", b"\r\nfrom:a@b\r\n");
        assert!(!synthesize(open, &params).is_satisfied());
    }
}
