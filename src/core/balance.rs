use crate::core::Transaction;
use crate::wallet::Party;

/// Net effect of `transactions` on `party`: received amounts minus sent amounts
pub fn transactions_balance<'a, I>(transactions: I, party: &Party) -> i64
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions
        .into_iter()
        .map(|transaction| {
            if transaction.get_sender() == party {
                -transaction.get_amount()
            } else if transaction.get_recipient() == party {
                transaction.get_amount()
            } else {
                0
            }
        })
        .sum()
}
