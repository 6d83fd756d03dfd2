//! A batch of instructions plus the signers it needs, with size-bounded
//! partitioning into individually valid on-chain transactions.

use std::rc::Rc;

use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::packet::PACKET_DATA_SIZE;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;
use solana_sdk::transaction::Transaction;

use crate::error::AdminError;

/// Hard per-transaction size budget of the ledger.
pub const MAX_TRANSACTION_SIZE: usize = PACKET_DATA_SIZE;

/// An ordered instruction batch bound to a fee payer and the set of signing
/// keys required beyond the payer. Instructions accumulate in submission
/// order; `combine` preserves order (self's instructions precede other's).
#[derive(Clone)]
pub struct TransactionEnvelope {
    payer: Rc<dyn Signer>,
    instructions: Vec<Instruction>,
    signers: Vec<Rc<dyn Signer>>,
}

impl TransactionEnvelope {
    pub fn new(payer: Rc<dyn Signer>) -> Self {
        Self {
            payer,
            instructions: Vec::new(),
            signers: Vec::new(),
        }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Registers a signer. The payer and already-known keys are skipped.
    pub fn add_signer(&mut self, signer: Rc<dyn Signer>) {
        let key = signer.pubkey();
        if key == self.payer.pubkey() {
            return;
        }
        if self.signers.iter().any(|known| known.pubkey() == key) {
            return;
        }
        self.signers.push(signer);
    }

    /// Concatenates two envelopes: instruction order is preserved, the
    /// signer sets are unioned.
    pub fn combine(mut self, other: TransactionEnvelope) -> TransactionEnvelope {
        self.instructions.extend(other.instructions);
        for signer in other.signers {
            self.add_signer(signer);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn signers(&self) -> &[Rc<dyn Signer>] {
        &self.signers
    }

    pub fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn payer_signer(&self) -> Rc<dyn Signer> {
        self.payer.clone()
    }

    /// Serialized size of the whole batch as a single transaction.
    pub fn serialized_size(&self) -> Result<usize, AdminError> {
        serialized_size_of(&self.payer.pubkey(), &self.instructions)
    }

    /// Whether the whole batch fits a single on-chain transaction.
    pub fn fits_one_transaction(&self) -> Result<bool, AdminError> {
        Ok(self.serialized_size()? <= MAX_TRANSACTION_SIZE)
    }

    /// Splits the batch into an ordered sequence of sub-envelopes, each
    /// within the per-transaction size budget. Boundaries never split one
    /// instruction; the sequence must be executed strictly in order since
    /// later partitions may depend on accounts created by earlier ones.
    pub fn partition(&self) -> Result<Vec<TransactionEnvelope>, AdminError> {
        let payer = self.payer.pubkey();
        let mut partitions = Vec::new();
        let mut current: Vec<Instruction> = Vec::new();

        for instruction in &self.instructions {
            let mut candidate = current.clone();
            candidate.push(instruction.clone());
            if serialized_size_of(&payer, &candidate)? <= MAX_TRANSACTION_SIZE {
                current = candidate;
                continue;
            }
            if current.is_empty() {
                return Err(AdminError::SizeBudgetExceeded {
                    size: serialized_size_of(&payer, &candidate)?,
                    limit: MAX_TRANSACTION_SIZE,
                });
            }
            partitions.push(self.subset(std::mem::take(&mut current)));
            let single = vec![instruction.clone()];
            let size = serialized_size_of(&payer, &single)?;
            if size > MAX_TRANSACTION_SIZE {
                return Err(AdminError::SizeBudgetExceeded {
                    size,
                    limit: MAX_TRANSACTION_SIZE,
                });
            }
            current = single;
        }
        if !current.is_empty() {
            partitions.push(self.subset(current));
        }
        Ok(partitions)
    }

    /// A sub-envelope over `instructions`, carrying only the signers those
    /// instructions actually reference.
    fn subset(&self, instructions: Vec<Instruction>) -> TransactionEnvelope {
        let needed: Vec<Pubkey> = instructions
            .iter()
            .flat_map(|ix| ix.accounts.iter())
            .filter(|meta| meta.is_signer)
            .map(|meta| meta.pubkey)
            .collect();
        let signers = self
            .signers
            .iter()
            .filter(|signer| needed.contains(&signer.pubkey()))
            .cloned()
            .collect();
        TransactionEnvelope {
            payer: self.payer.clone(),
            instructions,
            signers,
        }
    }

    /// The batch as an unsigned transaction, for simulation with signature
    /// verification disabled.
    pub fn unsigned_transaction(&self) -> Transaction {
        let message = Message::new_with_blockhash(
            &self.instructions,
            Some(&self.payer.pubkey()),
            &Hash::default(),
        );
        Transaction::new_unsigned(message)
    }

    /// The batch signed by the payer and every required signer.
    pub fn signed_transaction(&self, blockhash: Hash) -> Result<Transaction, AdminError> {
        let message = Message::new_with_blockhash(
            &self.instructions,
            Some(&self.payer.pubkey()),
            &blockhash,
        );
        let required: Vec<Pubkey> =
            message.account_keys[..message.header.num_required_signatures as usize].to_vec();
        let mut tx = Transaction::new_unsigned(message);

        let mut signers: Vec<&dyn Signer> = Vec::with_capacity(required.len());
        for key in &required {
            if *key == self.payer.pubkey() {
                signers.push(self.payer.as_ref());
            } else if let Some(signer) = self.signers.iter().find(|s| s.pubkey() == *key) {
                signers.push(signer.as_ref());
            } else {
                return Err(AdminError::MissingSigner { address: *key });
            }
        }
        tx.try_sign(&signers, blockhash)?;
        Ok(tx)
    }

    /// Base64 dump of the unsigned transaction, for use with inspectors and
    /// out-of-band multisig tooling.
    pub fn dump_base64(&self) -> Result<String, AdminError> {
        use base64::Engine;
        let bytes = bincode::serialize(&self.unsigned_transaction())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

fn serialized_size_of(payer: &Pubkey, instructions: &[Instruction]) -> Result<usize, AdminError> {
    let message = Message::new_with_blockhash(instructions, Some(payer), &Hash::default());
    let tx = Transaction::new_unsigned(message);
    Ok(bincode::serialized_size(&tx)? as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::AccountMeta;
    use solana_sdk::signature::Keypair;

    fn payer() -> Rc<dyn Signer> {
        Rc::new(Keypair::new())
    }

    fn bulky_instruction(bytes: usize) -> Instruction {
        Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![AccountMeta::new(Pubkey::new_unique(), false)],
            data: vec![0; bytes],
        }
    }

    fn signed_instruction(signer: &Pubkey, bytes: usize) -> Instruction {
        Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![AccountMeta::new_readonly(*signer, true)],
            data: vec![0; bytes],
        }
    }

    #[test]
    fn test_combine_preserves_order_and_unions_signers() {
        let payer = payer();
        let shared: Rc<dyn Signer> = Rc::new(Keypair::new());

        let mut a = TransactionEnvelope::new(payer.clone());
        a.push(bulky_instruction(1));
        a.add_signer(shared.clone());
        let mut b = TransactionEnvelope::new(payer.clone());
        b.push(bulky_instruction(2));
        b.add_signer(shared.clone());
        b.add_signer(Rc::new(Keypair::new()));

        let combined = a.combine(b);
        assert_eq!(combined.instructions().len(), 2);
        assert_eq!(combined.instructions()[0].data.len(), 1);
        assert_eq!(combined.instructions()[1].data.len(), 2);
        assert_eq!(combined.signers().len(), 2);
    }

    #[test]
    fn test_payer_never_registered_as_extra_signer() {
        let keypair = Rc::new(Keypair::new());
        let mut env = TransactionEnvelope::new(keypair.clone());
        env.add_signer(keypair);
        assert!(env.signers().is_empty());
    }

    #[test]
    fn test_small_batch_is_one_partition() {
        let mut env = TransactionEnvelope::new(payer());
        env.push(bulky_instruction(10));
        env.push(bulky_instruction(20));
        let parts = env.partition().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].instructions().len(), 2);
    }

    #[test]
    fn test_oversized_batch_splits_in_order() {
        let mut env = TransactionEnvelope::new(payer());
        for i in 0..10 {
            let mut ix = bulky_instruction(400);
            ix.data[0] = i;
            env.push(ix);
        }
        let parts = env.partition().unwrap();
        assert!(parts.len() >= 2);

        let mut flattened = Vec::new();
        for part in &parts {
            assert!(part.serialized_size().unwrap() <= MAX_TRANSACTION_SIZE);
            flattened.extend(part.instructions().iter().map(|ix| ix.data[0]));
        }
        assert_eq!(flattened, (0..10).collect::<Vec<u8>>());
    }

    #[test]
    fn test_partition_filters_signers() {
        let first = Keypair::new();
        let second = Keypair::new();
        let mut env = TransactionEnvelope::new(payer());
        env.push(signed_instruction(&first.pubkey(), 600));
        env.push(signed_instruction(&second.pubkey(), 600));
        env.add_signer(Rc::new(first.insecure_clone()));
        env.add_signer(Rc::new(second.insecure_clone()));

        let parts = env.partition().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].signers().len(), 1);
        assert_eq!(parts[0].signers()[0].pubkey(), first.pubkey());
        assert_eq!(parts[1].signers()[0].pubkey(), second.pubkey());
    }

    #[test]
    fn test_unsplittable_instruction_is_fatal() {
        let mut env = TransactionEnvelope::new(payer());
        env.push(bulky_instruction(MAX_TRANSACTION_SIZE + 1));
        match env.partition() {
            Err(AdminError::SizeBudgetExceeded { size, limit }) => {
                assert!(size > limit);
            }
            other => panic!("expected SizeBudgetExceeded, got {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn test_signing_requires_every_referenced_signer() {
        let foreign = Pubkey::new_unique();
        let mut env = TransactionEnvelope::new(payer());
        env.push(signed_instruction(&foreign, 1));
        match env.signed_transaction(Hash::default()) {
            Err(AdminError::MissingSigner { address }) => assert_eq!(address, foreign),
            _ => panic!("expected MissingSigner"),
        }
    }
}
