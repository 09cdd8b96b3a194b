//! Trolley→order workflow.
//!
//! Converts an account's entire trolley into one immutable priced order:
//! validates address ownership, atomically reserves stock for every line
//! item, freezes each line's unit price at the moment of sale, links the
//! line items to the new order, removes them from the trolley, and emits
//! invoice and receipt documents.
//!
//! The workflow runs against a [`CheckoutTx`] port representing a single
//! storage transaction. All-or-nothing semantics come from the caller:
//! commit only on `Ok`, roll back (drop) on any `Err`. Concurrent orders
//! racing for the same product serialize inside [`CheckoutTx::reserve_stock`]
//! (a guarded decrement in the Postgres implementation); the loser observes
//! insufficient stock and the whole placement fails with nothing committed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{AccountId, AddressId, InvoiceId, LineItemId, OrderId, ProductId, ReceiptId};

/// A trolley line as read at the start of checkout.
#[derive(Debug, Clone, Copy)]
pub struct CartLine {
    /// The line item row.
    pub line_item: LineItemId,
    /// Product ordered.
    pub product: ProductId,
    /// Units ordered; cart endpoints guarantee this is positive.
    pub quantity: i32,
}

/// One line of a placed order, with its frozen unit price.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlacedLine {
    /// The line item row, now owned by the order.
    pub line_item: LineItemId,
    /// Product ordered.
    pub product: ProductId,
    /// Units ordered.
    pub quantity: i32,
    /// Unit price at the moment of sale; never changes afterwards.
    pub unit_price: Decimal,
}

/// Result of a successful placement.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    /// The new order.
    pub order_id: OrderId,
    /// Invoice emitted for the order.
    pub invoice_id: InvoiceId,
    /// Receipt emitted for the order.
    pub receipt_id: ReceiptId,
    /// Ordering account.
    pub account_id: AccountId,
    /// Shipping address recorded on the order.
    pub address_id: AddressId,
    /// Placement timestamp.
    pub placed_at: DateTime<Utc>,
    /// The order's lines with frozen prices.
    pub lines: Vec<PlacedLine>,
    /// Sum of `quantity * unit_price` over all lines.
    pub total: Decimal,
}

/// Why an order placement failed. Nothing is committed on any of these.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    /// The account's trolley has no line items.
    #[error("trolley is empty")]
    EmptyTrolley,
    /// The address does not exist.
    #[error("address {0} not found")]
    AddressNotFound(AddressId),
    /// The address belongs to a different account.
    #[error("address {0} is not owned by the ordering account")]
    AddressNotOwned(AddressId),
    /// A product cannot cover the requested quantity right now.
    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),
    /// The storage transaction itself failed.
    #[error("storage error during checkout")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// One storage transaction backing a single `place_order` call.
///
/// Implementations must make `reserve_stock` atomic with respect to
/// concurrent reservations of the same product: check `available` and
/// decrement it in one step (row lock or guarded update), returning the
/// product's current list price on success and `None` when the quantity
/// cannot be covered.
// Callers only ever use concrete transaction types, so the futures'
// Send-ness resolves at instantiation.
#[allow(async_fn_in_trait)]
pub trait CheckoutTx {
    /// Storage-layer error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// All line items currently in the account's trolley.
    async fn trolley_lines(&mut self, account: AccountId) -> Result<Vec<CartLine>, Self::Error>;

    /// Owner of the address, or `None` if it does not exist.
    async fn address_owner(&mut self, address: AddressId)
    -> Result<Option<AccountId>, Self::Error>;

    /// Atomically decrement the product's `available` by `quantity`.
    ///
    /// Returns the unit price to freeze on success, `None` if `available`
    /// cannot cover the quantity. Must never drive `available` negative.
    async fn reserve_stock(
        &mut self,
        product: ProductId,
        quantity: i32,
    ) -> Result<Option<Decimal>, Self::Error>;

    /// Insert the order row.
    async fn create_order(
        &mut self,
        account: AccountId,
        address: AddressId,
        placed_at: DateTime<Utc>,
    ) -> Result<OrderId, Self::Error>;

    /// Freeze `price_at_sale` on the line item and link it to the order.
    async fn attach_line(
        &mut self,
        order: OrderId,
        line_item: LineItemId,
        unit_price: Decimal,
    ) -> Result<(), Self::Error>;

    /// Remove the line item from the trolley relation (the row itself
    /// survives, referenced by the order).
    async fn remove_from_trolley(
        &mut self,
        account: AccountId,
        line_item: LineItemId,
    ) -> Result<(), Self::Error>;

    /// Emit the invoice document for the order.
    async fn create_invoice(
        &mut self,
        order: OrderId,
        account: AccountId,
        placed_at: DateTime<Utc>,
    ) -> Result<InvoiceId, Self::Error>;

    /// Emit the receipt document for the order.
    async fn create_receipt(
        &mut self,
        order: OrderId,
        account: AccountId,
        placed_at: DateTime<Utc>,
    ) -> Result<ReceiptId, Self::Error>;
}

fn store_err<E>(e: E) -> OrderError
where
    E: std::error::Error + Send + Sync + 'static,
{
    OrderError::Store(Box::new(e))
}

/// Convert the account's entire trolley into one order.
///
/// Runs the full sequence described in the module docs inside the supplied
/// transaction. The caller must commit on `Ok` and roll back on `Err`; this
/// function never leaves partial effects visible either way.
///
/// # Errors
///
/// See [`OrderError`]. `InsufficientStock` names the first product that
/// could not be covered; there is no partial fulfillment.
pub async fn place_order<T: CheckoutTx>(
    tx: &mut T,
    account: AccountId,
    address: AddressId,
    now: DateTime<Utc>,
) -> Result<OrderSummary, OrderError> {
    let cart = tx.trolley_lines(account).await.map_err(store_err)?;
    if cart.is_empty() {
        return Err(OrderError::EmptyTrolley);
    }

    match tx.address_owner(address).await.map_err(store_err)? {
        None => return Err(OrderError::AddressNotFound(address)),
        Some(owner) if owner != account => return Err(OrderError::AddressNotOwned(address)),
        Some(_) => {}
    }

    // Reserve stock line by line; the first shortfall aborts the whole
    // placement and the caller rolls back earlier decrements.
    let mut lines = Vec::with_capacity(cart.len());
    for cart_line in &cart {
        let unit_price = tx
            .reserve_stock(cart_line.product, cart_line.quantity)
            .await
            .map_err(store_err)?
            .ok_or(OrderError::InsufficientStock(cart_line.product))?;
        lines.push(PlacedLine {
            line_item: cart_line.line_item,
            product: cart_line.product,
            quantity: cart_line.quantity,
            unit_price,
        });
    }

    let order_id = tx
        .create_order(account, address, now)
        .await
        .map_err(store_err)?;

    for line in &lines {
        tx.attach_line(order_id, line.line_item, line.unit_price)
            .await
            .map_err(store_err)?;
        tx.remove_from_trolley(account, line.line_item)
            .await
            .map_err(store_err)?;
    }

    let invoice_id = tx
        .create_invoice(order_id, account, now)
        .await
        .map_err(store_err)?;
    let receipt_id = tx
        .create_receipt(order_id, account, now)
        .await
        .map_err(store_err)?;

    let total = lines
        .iter()
        .map(|l| l.unit_price * Decimal::from(l.quantity))
        .sum();

    Ok(OrderSummary {
        order_id,
        invoice_id,
        receipt_id,
        account_id: account,
        address_id: address,
        placed_at: now,
        lines,
        total,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::convert::Infallible;
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct MemProduct {
        price: Decimal,
        stock: i32,
        available: i32,
    }

    /// Committed shop state shared between "transactions".
    #[derive(Debug, Clone, Default)]
    struct MemState {
        products: BTreeMap<ProductId, MemProduct>,
        addresses: BTreeMap<AddressId, AccountId>,
        trolley: Vec<(AccountId, CartLine)>,
        // line item id -> frozen price_at_sale
        frozen_prices: BTreeMap<LineItemId, Decimal>,
        orders: BTreeMap<OrderId, (AccountId, AddressId)>,
        order_items: BTreeMap<OrderId, Vec<LineItemId>>,
        invoices: Vec<(InvoiceId, OrderId)>,
        receipts: Vec<(ReceiptId, OrderId)>,
        next_id: i32,
    }

    impl MemState {
        fn next(&mut self) -> i32 {
            self.next_id += 1;
            self.next_id
        }
    }

    /// In-memory store with transaction-per-lock semantics: a transaction
    /// holds the lock (serializing, like a row lock would) and mutates a
    /// staged copy that only replaces the committed state on `commit`.
    #[derive(Clone, Default)]
    struct MemShop {
        state: Arc<Mutex<MemState>>,
    }

    struct MemTx {
        guard: tokio::sync::OwnedMutexGuard<MemState>,
        staged: MemState,
    }

    impl MemShop {
        async fn begin(&self) -> MemTx {
            let guard = Arc::clone(&self.state).lock_owned().await;
            let staged = guard.clone();
            MemTx { guard, staged }
        }

        async fn snapshot(&self) -> MemState {
            self.state.lock().await.clone()
        }

        async fn seed_product(&self, id: i32, price: Decimal, stock: i32, available: i32) {
            assert!(available <= stock);
            self.state.lock().await.products.insert(
                ProductId::new(id),
                MemProduct {
                    price,
                    stock,
                    available,
                },
            );
        }

        async fn seed_address(&self, id: i32, owner: i32) {
            self.state
                .lock()
                .await
                .addresses
                .insert(AddressId::new(id), AccountId::new(owner));
        }

        async fn seed_cart_line(&self, account: i32, product: i32, quantity: i32) -> LineItemId {
            let mut state = self.state.lock().await;
            let id = LineItemId::new(state.next());
            state.trolley.push((
                AccountId::new(account),
                CartLine {
                    line_item: id,
                    product: ProductId::new(product),
                    quantity,
                },
            ));
            id
        }

        async fn set_price(&self, product: i32, price: Decimal) {
            self.state
                .lock()
                .await
                .products
                .get_mut(&ProductId::new(product))
                .unwrap()
                .price = price;
        }
    }

    impl MemTx {
        fn commit(mut self) {
            *self.guard = self.staged;
        }
    }

    impl CheckoutTx for MemTx {
        type Error = Infallible;

        async fn trolley_lines(&mut self, account: AccountId) -> Result<Vec<CartLine>, Infallible> {
            Ok(self
                .staged
                .trolley
                .iter()
                .filter(|(a, _)| *a == account)
                .map(|(_, line)| *line)
                .collect())
        }

        async fn address_owner(
            &mut self,
            address: AddressId,
        ) -> Result<Option<AccountId>, Infallible> {
            Ok(self.staged.addresses.get(&address).copied())
        }

        async fn reserve_stock(
            &mut self,
            product: ProductId,
            quantity: i32,
        ) -> Result<Option<Decimal>, Infallible> {
            let Some(p) = self.staged.products.get_mut(&product) else {
                return Ok(None);
            };
            if p.available < quantity {
                return Ok(None);
            }
            p.available -= quantity;
            Ok(Some(p.price))
        }

        async fn create_order(
            &mut self,
            account: AccountId,
            address: AddressId,
            _placed_at: DateTime<Utc>,
        ) -> Result<OrderId, Infallible> {
            let id = OrderId::new(self.staged.next());
            self.staged.orders.insert(id, (account, address));
            Ok(id)
        }

        async fn attach_line(
            &mut self,
            order: OrderId,
            line_item: LineItemId,
            unit_price: Decimal,
        ) -> Result<(), Infallible> {
            self.staged.frozen_prices.insert(line_item, unit_price);
            self.staged
                .order_items
                .entry(order)
                .or_default()
                .push(line_item);
            Ok(())
        }

        async fn remove_from_trolley(
            &mut self,
            account: AccountId,
            line_item: LineItemId,
        ) -> Result<(), Infallible> {
            self.staged
                .trolley
                .retain(|(a, line)| !(*a == account && line.line_item == line_item));
            Ok(())
        }

        async fn create_invoice(
            &mut self,
            order: OrderId,
            _account: AccountId,
            _placed_at: DateTime<Utc>,
        ) -> Result<InvoiceId, Infallible> {
            let id = InvoiceId::new(self.staged.next());
            self.staged.invoices.push((id, order));
            Ok(id)
        }

        async fn create_receipt(
            &mut self,
            order: OrderId,
            _account: AccountId,
            _placed_at: DateTime<Utc>,
        ) -> Result<ReceiptId, Infallible> {
            let id = ReceiptId::new(self.staged.next());
            self.staged.receipts.push((id, order));
            Ok(id)
        }
    }

    /// Run a full placement the way the server does: commit on Ok, drop
    /// (roll back) on Err.
    async fn try_place(
        shop: &MemShop,
        account: i32,
        address: i32,
    ) -> Result<OrderSummary, OrderError> {
        let mut tx = shop.begin().await;
        let result = place_order(
            &mut tx,
            AccountId::new(account),
            AddressId::new(address),
            Utc::now(),
        )
        .await;
        if result.is_ok() {
            tx.commit();
        }
        result
    }

    fn price(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn assert_available_within_stock(state: &MemState) {
        for (id, p) in &state.products {
            assert!(p.available >= 0, "product {id} available went negative");
            assert!(p.available <= p.stock, "product {id} available > stock");
        }
    }

    #[tokio::test]
    async fn keyboard_scenario_places_one_order() {
        let shop = MemShop::default();
        shop.seed_product(10, price(119_99), 200, 140).await;
        shop.seed_address(5, 1).await;
        let line = shop.seed_cart_line(1, 10, 1).await;

        let summary = try_place(&shop, 1, 5).await.unwrap();

        assert_eq!(summary.lines.len(), 1);
        assert_eq!(summary.lines[0].unit_price, price(119_99));
        assert_eq!(summary.total, price(119_99));

        let state = shop.snapshot().await;
        assert_eq!(state.products[&ProductId::new(10)].available, 139);
        assert_eq!(state.frozen_prices[&line], price(119_99));
        assert!(state.trolley.is_empty(), "trolley entry should be removed");
        assert_eq!(state.order_items[&summary.order_id], vec![line]);
        assert_eq!(state.invoices.len(), 1);
        assert_eq!(state.receipts.len(), 1);
        assert_available_within_stock(&state);
    }

    #[tokio::test]
    async fn empty_trolley_fails_and_mutates_nothing() {
        let shop = MemShop::default();
        shop.seed_product(10, price(9_99), 5, 5).await;
        shop.seed_address(5, 1).await;

        let before = shop.snapshot().await;
        let err = try_place(&shop, 1, 5).await.unwrap_err();
        assert!(matches!(err, OrderError::EmptyTrolley));

        let after = shop.snapshot().await;
        assert_eq!(after.orders.len(), before.orders.len());
        assert_eq!(
            after.products[&ProductId::new(10)].available,
            before.products[&ProductId::new(10)].available
        );
    }

    #[tokio::test]
    async fn address_ownership_is_checked() {
        let shop = MemShop::default();
        shop.seed_product(10, price(9_99), 5, 5).await;
        shop.seed_address(5, 2).await; // owned by account 2
        shop.seed_cart_line(1, 10, 1).await;

        assert!(matches!(
            try_place(&shop, 1, 99).await,
            Err(OrderError::AddressNotFound(_))
        ));
        assert!(matches!(
            try_place(&shop, 1, 5).await,
            Err(OrderError::AddressNotOwned(_))
        ));

        let state = shop.snapshot().await;
        assert!(state.orders.is_empty());
        assert_eq!(state.products[&ProductId::new(10)].available, 5);
    }

    #[tokio::test]
    async fn insufficient_stock_aborts_atomically() {
        // First line fits, second does not; the first decrement must not
        // survive the rollback.
        let shop = MemShop::default();
        shop.seed_product(10, price(5_00), 50, 50).await;
        shop.seed_product(11, price(7_50), 3, 2).await;
        shop.seed_address(5, 1).await;
        shop.seed_cart_line(1, 10, 4).await;
        shop.seed_cart_line(1, 11, 3).await;

        let err = try_place(&shop, 1, 5).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock(p) if p == ProductId::new(11)
        ));

        let state = shop.snapshot().await;
        assert_eq!(state.products[&ProductId::new(10)].available, 50);
        assert_eq!(state.products[&ProductId::new(11)].available, 2);
        assert!(state.orders.is_empty());
        assert_eq!(state.trolley.len(), 2, "trolley untouched");
        assert_available_within_stock(&state);
    }

    #[tokio::test]
    async fn frozen_price_ignores_later_price_changes() {
        let shop = MemShop::default();
        shop.seed_product(10, price(119_99), 200, 140).await;
        shop.seed_address(5, 1).await;
        let line = shop.seed_cart_line(1, 10, 2).await;

        let summary = try_place(&shop, 1, 5).await.unwrap();
        assert_eq!(summary.total, price(239_98));

        shop.set_price(10, price(999_99)).await;

        let state = shop.snapshot().await;
        assert_eq!(state.frozen_prices[&line], price(119_99));
    }

    #[tokio::test]
    async fn racing_orders_for_last_unit_yield_one_winner() {
        let shop = MemShop::default();
        shop.seed_product(10, price(49_00), 1, 1).await;
        shop.seed_address(5, 1).await;
        shop.seed_address(6, 2).await;
        shop.seed_cart_line(1, 10, 1).await;
        shop.seed_cart_line(2, 10, 1).await;

        let a = tokio::spawn({
            let shop = shop.clone();
            async move { try_place(&shop, 1, 5).await }
        });
        let b = tokio::spawn({
            let shop = shop.clone();
            async move { try_place(&shop, 2, 6).await }
        });

        let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
        let winners = usize::from(ra.is_ok()) + usize::from(rb.is_ok());
        assert_eq!(winners, 1, "exactly one placement must succeed");

        let loser = if ra.is_ok() { rb } else { ra };
        assert!(matches!(
            loser.unwrap_err(),
            OrderError::InsufficientStock(_)
        ));

        let state = shop.snapshot().await;
        assert_eq!(state.products[&ProductId::new(10)].available, 0);
        assert_eq!(state.orders.len(), 1);
        assert_available_within_stock(&state);
    }
}
